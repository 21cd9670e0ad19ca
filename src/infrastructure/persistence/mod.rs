//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx. Schema and
//! indexes live in `migrations/` and are applied at startup.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link storage, click counter and expiry sweep
//! - [`PgVisitRepository`] - Visit log

pub mod pg_link_repository;
pub mod pg_visit_repository;

pub use pg_link_repository::PgLinkRepository;
pub use pg_visit_repository::PgVisitRepository;
