//! Business logic services for the application layer.

pub mod cleanup_service;
pub mod link_service;
pub mod visit_service;

pub use cleanup_service::{CleanupService, SweepOutcome, SweeperState};
pub use link_service::LinkService;
pub use visit_service::{VisitRetryPolicy, VisitService};
