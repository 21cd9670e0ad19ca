//! Background sweeper that deletes expired links.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::domain::repositories::LinkRepository;

/// Observable sweeper state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    /// Waiting for the next tick.
    Idle,
    /// A sweep is in progress.
    Running,
    /// The loop has exited. Terminal.
    Stopped,
}

impl SweeperState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SweeperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    Deleted(u64),
    Failed,
    TimedOut,
}

/// Periodic expired-link sweeper.
///
/// The sweep is one bulk `delete_expired(now)` call, so it needs no coordination
/// with redirects in flight. Errors are logged and counted; the loop never stops
/// on them.
pub struct CleanupService {
    link_repository: Arc<dyn LinkRepository>,
    interval: Duration,
    sweep_timeout: Duration,
    state: watch::Sender<SweeperState>,
}

impl CleanupService {
    pub fn new(
        link_repository: Arc<dyn LinkRepository>,
        interval: Duration,
        sweep_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SweeperState::Idle);
        Self {
            link_repository,
            interval,
            sweep_timeout,
            state,
        }
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SweeperState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SweeperState {
        *self.state.borrow()
    }

    /// Runs the sweep loop until `shutdown` is cancelled.
    ///
    /// The first sweep happens immediately. A sweep in progress when `shutdown`
    /// fires is abandoned.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.sweep_timeout.as_secs(),
            "Expiration sweeper started"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Abandoning in-flight sweep on shutdown");
                    break;
                }
                _ = self.sweep_once() => {}
            }
        }

        self.state.send_replace(SweeperState::Stopped);
        info!("Expiration sweeper stopped");
    }

    /// Runs one sweep bounded by the per-sweep timeout.
    ///
    /// Never returns an error; the outcome is logged and reported.
    pub async fn sweep_once(&self) -> SweepOutcome {
        self.state.send_replace(SweeperState::Running);

        let now = Utc::now();
        let sweep = timeout(self.sweep_timeout, self.link_repository.delete_expired(now));
        let outcome = match sweep.await {
            Ok(Ok(deleted)) => {
                if deleted > 0 {
                    info!(deleted, "Removed expired links");
                    metrics::counter!("linkbio_links_swept_total").increment(deleted);
                } else {
                    debug!("No expired links to remove");
                }
                SweepOutcome::Deleted(deleted)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Expired link sweep failed");
                metrics::counter!("linkbio_sweep_failures_total").increment(1);
                SweepOutcome::Failed
            }
            Err(_) => {
                error!(
                    timeout_secs = self.sweep_timeout.as_secs(),
                    "Expired link sweep timed out"
                );
                metrics::counter!("linkbio_sweep_failures_total").increment(1);
                SweepOutcome::TimedOut
            }
        };

        self.state.send_if_modified(|state| {
            if *state == SweeperState::Running {
                *state = SweeperState::Idle;
                true
            } else {
                false
            }
        });

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockLinkRepository;
    use crate::error::AppError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_sweep_once_reports_deleted_count() {
        let mut repo = MockLinkRepository::new();
        repo.expect_delete_expired()
            .times(1)
            .returning(|_| Ok(3));

        let service = CleanupService::new(
            Arc::new(repo),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );

        assert_eq!(service.sweep_once().await, SweepOutcome::Deleted(3));
        assert_eq!(service.state(), SweeperState::Idle);
    }

    #[tokio::test]
    async fn test_sweep_once_swallows_errors() {
        let mut repo = MockLinkRepository::new();
        repo.expect_delete_expired()
            .returning(|_| Err(AppError::storage("Database error", json!({}))));

        let service = CleanupService::new(
            Arc::new(repo),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );

        assert_eq!(service.sweep_once().await, SweepOutcome::Failed);
        assert_eq!(service.state(), SweeperState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_immediately_and_on_every_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut repo = MockLinkRepository::new();
        repo.expect_delete_expired().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::storage("Database error", json!({})))
        });

        let service = Arc::new(CleanupService::new(
            Arc::new(repo),
            Duration::from_secs(10),
            Duration::from_secs(1),
        ));
        let shutdown = CancellationToken::new();
        let mut state = service.subscribe();

        let handle = tokio::spawn({
            let service = service.clone();
            let shutdown = shutdown.clone();
            async move { service.run(shutdown).await }
        });

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        shutdown.cancel();
        handle.await.unwrap();

        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), SweeperState::Stopped);
        assert_eq!(service.state(), SweeperState::Stopped);
    }
}
