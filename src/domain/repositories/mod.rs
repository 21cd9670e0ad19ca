//! Repository trait definitions for the domain layer.
//!
//! These traits abstract data access following the Repository pattern. Services
//! receive them as explicitly constructed `Arc<dyn …>` handles.
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Link CRUD, atomic click counter, bulk expiry deletion
//! - [`VisitRepository`] - Append-only visit log
//!
//! # Testing
//!
//! Mock implementations are auto-generated via `mockall` for unit tests. See
//! integration tests in `tests/repository_*.rs` for the PostgreSQL implementations.

pub mod link_repository;
pub mod visit_repository;

pub use link_repository::LinkRepository;
pub use visit_repository::VisitRepository;

#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use visit_repository::MockVisitRepository;
