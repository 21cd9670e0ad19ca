//! Repository trait for the append-only visit log.

use crate::domain::entities::{NewVisit, Visit};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for visit records.
///
/// Visits are appended once and never updated or individually deleted.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgVisitRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::MemoryVisitRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitRepository: Send + Sync {
    /// Appends a visit and returns the stored record with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on write failure.
    async fn create(&self, new_visit: NewVisit) -> Result<Visit, AppError>;

    /// Lists visits for a link, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on database errors.
    async fn list_by_link(
        &self,
        link_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Visit>, AppError>;
}
