//! Repository trait for link data access.

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for the link store.
///
/// Every method that mutates a single link is one atomic operation at the
/// storage layer. Callers never read-modify-write the click counter.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::MemoryLinkRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Persists a new link and returns the stored record.
    ///
    /// The store assigns `id`, sets `clicks = 0` and fills `created_at` if unset.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on write failure.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a link by id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Link))` if found
    /// - `Ok(None)` if not found
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on database errors.
    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError>;

    /// Lists an owner's links, newest first.
    ///
    /// No ordering is guaranteed among links created at the same instant.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on database errors.
    async fn list_by_owner(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Link>, AppError>;

    /// Applies the fields present in `patch`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this id.
    /// Returns [`AppError::Storage`] on database errors.
    async fn update(&self, id: i64, patch: LinkPatch) -> Result<(), AppError>;

    /// Removes a link.
    ///
    /// Returns `Ok(true)` if a row was removed, `Ok(false)` if the id was absent.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on database errors.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Deletes every link whose expiration is set and strictly before `now`.
    ///
    /// Runs as a single bulk delete, never as read-then-delete.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on database errors.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;

    /// Atomically increments the click counter by one.
    ///
    /// Returns `Ok(false)` if the link no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on database errors.
    async fn increment_clicks(&self, id: i64) -> Result<bool, AppError>;

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] if the store cannot be reached.
    async fn ping(&self) -> Result<(), AppError>;
}
