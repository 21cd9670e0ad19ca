//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /visit/{id}`  - Record a visit and redirect (public, rate limited)
//! - `GET  /health`      - Health check: storage and sweeper (public)
//! - `/api/*`            - REST API (Bearer token required)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **CORS** - Any origin, no credentials
//! - **Timeout** - Per-request deadline on `/health` and `/api`. The redirect
//!   bounds only its visit-write wait, see [`AppState::visit_wait`]
//! - **Rate limiting** - Per-IP token bucket on the redirect route
//! - **Authentication** - Bearer token on `/api`
//! - **Path normalization** - Trailing slash handling

use std::time::Duration;

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::rate_limit::{self, RateLimitSettings};
use crate::api::middleware::{auth, cors, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_governor::key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::timeout::TimeoutLayer;

/// Router-level settings taken from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub rate_limit: RateLimitSettings,
    /// When `true`, rate limiting reads the client IP from `X-Forwarded-For` /
    /// `X-Real-IP`. Enable only behind a trusted reverse proxy.
    pub behind_proxy: bool,
    pub request_timeout: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitSettings::default(),
            behind_proxy: false,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Constructs the application router with all routes and middleware.
pub fn build_router(state: AppState, options: &RouterOptions) -> Router {
    let api_router = api::routes::protected_routes().route_layer(middleware::from_fn(auth::layer));

    #[allow(deprecated)]
    let timeout = TimeoutLayer::new(options.request_timeout);

    // The timeout layer drops the handler future, so it stays off the redirect.
    let timed = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .layer(timeout);

    Router::new()
        .merge(visit_routes(options))
        .merge(timed)
        .with_state(state)
        .layer(cors::layer())
        .layer(tracing::layer())
}

/// [`build_router`] wrapped in trailing-slash normalization, ready to serve.
pub fn app_router(state: AppState, options: &RouterOptions) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state, options))
}

fn visit_routes(options: &RouterOptions) -> Router<AppState> {
    let router = Router::new().route("/visit/{id}", get(redirect_handler));

    let settings = &options.rate_limit;
    if !settings.enabled {
        return router;
    }

    if options.behind_proxy {
        if let Some(layer) = rate_limit::layer(SmartIpKeyExtractor, settings) {
            return router.layer(layer);
        }
    } else if let Some(layer) = rate_limit::layer(PeerIpKeyExtractor, settings) {
        return router.layer(layer);
    }

    ::tracing::warn!(?settings, "Invalid rate limit settings, redirect route is unlimited");
    router
}
