//! Shared application state injected into every handler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::application::services::{LinkService, SweeperState, VisitService};

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub visit_service: Arc<VisitService>,
    /// Cancelled when the server begins shutting down. Redirects derive
    /// their per-request cancellation from it.
    pub shutdown: CancellationToken,
    pub sweeper: watch::Receiver<SweeperState>,
    /// Trust `X-Forwarded-For` / `X-Real-IP` for the client address.
    pub behind_proxy: bool,
    /// Longest a redirect waits for the first visit-log attempt before
    /// answering anyway.
    pub visit_wait: Duration,
}

impl AppState {
    pub fn new(
        link_service: Arc<LinkService>,
        visit_service: Arc<VisitService>,
        shutdown: CancellationToken,
        sweeper: watch::Receiver<SweeperState>,
        behind_proxy: bool,
        visit_wait: Duration,
    ) -> Self {
        Self {
            link_service,
            visit_service,
            shutdown,
            sweeper,
            behind_proxy,
            visit_wait,
        }
    }
}
