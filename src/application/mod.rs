//! Application layer services implementing business logic.
//!
//! Services consume repository traits through `Arc<dyn …>` handles and provide
//! the API used by HTTP handlers, the admin CLI and the background sweeper.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Link CRUD and validation
//! - [`services::visit_service::VisitService`] - Redirect-path visit recording
//! - [`services::cleanup_service::CleanupService`] - Periodic expired-link sweep

pub mod services;
