//! Visit recording on the redirect path.
//!
//! [`VisitService::record_visit`] resolves a link, rejects expired ones, then splits
//! the work in two:
//!
//! - the visit-log append runs as a task on a [`TaskTracker`]; failed appends are
//!   retried with exponential backoff inside that task, and it is never aborted by
//!   the caller
//! - the click counter is incremented through the store's atomic primitive on
//!   the same tracker, so dropping the caller cannot abort it; its failure fails
//!   the call
//!
//! The caller then waits for the outcome of the first append attempt only, and
//! only until its own [`CancellationToken`] fires. Retries and failed or slow
//! writes are logged and counted, never returned.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::oneshot;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::domain::entities::{ClientInfo, Link, NewVisit, Visit, parse_link_id};
use crate::domain::repositories::{LinkRepository, VisitRepository};
use crate::error::AppError;

/// Retry settings for visit-log writes.
#[derive(Debug, Clone, Copy)]
pub struct VisitRetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for VisitRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl VisitRetryPolicy {
    /// Un-jittered delays before each retry: `base * 2^n`, capped at `max_delay_ms`.
    fn backoff(&self) -> impl Iterator<Item = Duration> + use<> {
        let cap = Duration::from_millis(self.max_delay_ms);

        // from_millis(2).factor(base) yields 2*base, 4*base, ...
        ExponentialBackoff::from_millis(2)
            .factor(self.base_delay_ms.max(1))
            .map(move |delay| (delay / 2).min(cap))
            .take(self.max_retries)
    }

    fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        self.backoff().map(jitter)
    }
}

/// The visit recorder.
///
/// Holds no state of its own beyond the tracker of in-flight store calls.
pub struct VisitService {
    link_repository: Arc<dyn LinkRepository>,
    visit_repository: Arc<dyn VisitRepository>,
    retry: VisitRetryPolicy,
    tracker: TaskTracker,
}

impl VisitService {
    /// Creates a recorder with the default retry policy.
    pub fn new(
        link_repository: Arc<dyn LinkRepository>,
        visit_repository: Arc<dyn VisitRepository>,
    ) -> Self {
        Self::with_retry_policy(link_repository, visit_repository, VisitRetryPolicy::default())
    }

    pub fn with_retry_policy(
        link_repository: Arc<dyn LinkRepository>,
        visit_repository: Arc<dyn VisitRepository>,
        retry: VisitRetryPolicy,
    ) -> Self {
        Self {
            link_repository,
            visit_repository,
            retry,
            tracker: TaskTracker::new(),
        }
    }

    /// Records one redirect against `link_id` and returns the link to redirect to.
    ///
    /// The returned link's `clicks` is the value read at lookup plus one. It is
    /// not re-read after the increment.
    ///
    /// Cancelling `cancel` after the expiry check only stops the wait for the
    /// visit write. Dropping the returned future abandons the call, but the
    /// visit write and the counter increment already started keep running on
    /// the tracker.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidId`] if `link_id` is malformed.
    /// Returns [`AppError::NotFound`] if the link does not exist.
    /// Returns [`AppError::Expired`] if the link's expiration has passed.
    /// Returns [`AppError::Storage`] if the lookup or the counter increment fails.
    /// Returns [`AppError::Internal`] if the increment task panics.
    pub async fn record_visit(
        &self,
        link_id: &str,
        client: ClientInfo,
        cancel: &CancellationToken,
    ) -> Result<Link, AppError> {
        let id = parse_link_id(link_id)?;

        let mut link = self
            .link_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;

        let now = Utc::now();
        if link.is_expired_at(now) {
            debug!(link_id = id, expires_at = ?link.expires_at, "Rejected visit to expired link");
            return Err(AppError::expired(
                "Link has expired",
                json!({ "id": id }),
            ));
        }

        let first_attempt = self.spawn_visit_write(client.into_visit(id, now));

        let increment = self.tracker.spawn({
            let repository = Arc::clone(&self.link_repository);
            async move { repository.increment_clicks(id).await }
        });

        let incremented = increment.await.map_err(|e| {
            error!(link_id = id, error = %e, "Click counter task panicked");
            AppError::internal("Failed to update click counter", json!({ "id": id }))
        })?;

        match incremented {
            Ok(true) => {}
            Ok(false) => {
                // Deleted between lookup and increment, usually by the sweeper.
                warn!(link_id = id, "Link vanished before click counter increment");
            }
            Err(e) => {
                error!(link_id = id, error = %e, "Failed to increment click counter");
                return Err(e);
            }
        }

        tokio::select! {
            attempted = first_attempt => {
                if attempted.is_err() {
                    error!(link_id = id, "Visit write task ended before its first attempt");
                }
            }
            _ = cancel.cancelled() => {
                debug!(link_id = id, "Caller cancelled, visit write continues in background");
            }
        }

        link.clicks += 1;
        Ok(link)
    }

    /// Spawns the visit append. The receiver fires once the first attempt has
    /// finished, whatever its outcome; retries happen after that.
    fn spawn_visit_write(&self, visit: NewVisit) -> oneshot::Receiver<()> {
        let repository = Arc::clone(&self.visit_repository);
        let mut delays = self.retry.delays();
        let (attempted, first_attempt) = oneshot::channel();

        self.tracker.spawn(async move {
            let link_id = visit.link_id;

            let mut result = repository.create(visit.clone()).await;
            // The receiver is gone when the caller stopped waiting.
            let _ = attempted.send(());

            if let Err(e) = &result
                && let Some(first_delay) = delays.next()
            {
                warn!(link_id, error = %e, "Visit write failed, retrying in background");
                tokio::time::sleep(first_delay).await;
                result = Retry::spawn(delays, || {
                    let repository = Arc::clone(&repository);
                    let visit = visit.clone();
                    async move { repository.create(visit).await }
                })
                .await;
            }

            match result {
                Ok(stored) => {
                    metrics::counter!("linkbio_visits_recorded_total").increment(1);
                    debug!(link_id, visit_id = stored.id, "Visit recorded");
                }
                Err(e) => {
                    metrics::counter!("linkbio_visit_write_failures_total").increment(1);
                    error!(link_id, error = %e, "Failed to record visit, giving up");
                }
            }
        });

        first_attempt
    }

    /// Lists visits for a link, most recent first.
    ///
    /// Works for ids whose link has since been deleted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidId`] if `link_id` is malformed.
    /// Returns [`AppError::Storage`] on database errors.
    pub async fn list_visits(
        &self,
        link_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Visit>, AppError> {
        let id = parse_link_id(link_id)?;
        self.visit_repository.list_by_link(id, limit, offset).await
    }

    /// Number of visit writes still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Closes the tracker and waits for running visit writes.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                debug!(pending, "Visit writes drained");
                true
            }
            Err(_) => {
                warn!(
                    remaining = self.tracker.len(),
                    timeout_secs = timeout.as_secs(),
                    "Timed out draining visit writes"
                );
                false
            }
        }
    }
}
