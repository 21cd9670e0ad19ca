#![allow(dead_code)]

use axum::extract::ConnectInfo;
use axum::http::HeaderValue;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use linkbio::api::middleware::rate_limit::RateLimitSettings;
use linkbio::prelude::*;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::Layer;

pub const PEER_ADDR: &str = "127.0.0.1:12345";

/// Application wired to in-memory stores, with handles on every part a test
/// may want to inspect.
pub struct TestApp {
    pub state: AppState,
    pub links: Arc<MemoryLinkRepository>,
    pub visits: Arc<MemoryVisitRepository>,
    pub visit_service: Arc<VisitService>,
    pub cleanup: Arc<CleanupService>,
    pub shutdown: CancellationToken,
}

impl TestApp {
    /// HTTP server over the full router, with rate limiting off and a fixed
    /// peer address.
    pub fn server(&self) -> TestServer {
        self.server_with(&test_router_options())
    }

    pub fn server_with(&self, options: &RouterOptions) -> TestServer {
        let app = build_router(self.state.clone(), options).layer(MockConnectInfoLayer);
        TestServer::new(app).unwrap()
    }
}

pub fn test_router_options() -> RouterOptions {
    RouterOptions {
        rate_limit: RateLimitSettings {
            enabled: false,
            ..RateLimitSettings::default()
        },
        ..RouterOptions::default()
    }
}

pub const TEST_VISIT_WAIT: Duration = Duration::from_secs(2);

pub fn fast_retry_policy() -> VisitRetryPolicy {
    VisitRetryPolicy {
        max_retries: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}

pub fn create_test_app() -> TestApp {
    let links = Arc::new(MemoryLinkRepository::new());
    let visits = Arc::new(MemoryVisitRepository::new());
    create_test_app_with(links.clone(), visits.clone(), links, visits)
}

/// Builds the app over arbitrary link/visit stores. The memory stores are kept
/// for assertions and may or may not be the ones the services use.
pub fn create_test_app_with(
    links: Arc<MemoryLinkRepository>,
    visits: Arc<MemoryVisitRepository>,
    link_store: Arc<dyn LinkRepository>,
    visit_store: Arc<dyn VisitRepository>,
) -> TestApp {
    let link_service = Arc::new(LinkService::new(link_store.clone()));
    let visit_service = Arc::new(VisitService::with_retry_policy(
        link_store.clone(),
        visit_store,
        fast_retry_policy(),
    ));
    let cleanup = Arc::new(CleanupService::new(
        link_store,
        Duration::from_secs(60),
        Duration::from_secs(5),
    ));
    let shutdown = CancellationToken::new();

    let state = AppState::new(
        link_service,
        visit_service.clone(),
        shutdown.clone(),
        cleanup.subscribe(),
        false,
        TEST_VISIT_WAIT,
    );

    TestApp {
        state,
        links,
        visits,
        visit_service,
        cleanup,
        shutdown,
    }
}

pub async fn seed_link(
    links: &dyn LinkRepository,
    owner: &str,
    title: &str,
    url: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Link {
    links
        .create(NewLink {
            title: title.to_string(),
            url: url.to_string(),
            expires_at,
            user_id: owner.to_string(),
            created_at: None,
        })
        .await
        .unwrap()
}

pub async fn seed_link_created_at(
    links: &dyn LinkRepository,
    owner: &str,
    title: &str,
    created_at: DateTime<Utc>,
) -> Link {
    links
        .create(NewLink {
            title: title.to_string(),
            url: "https://example.com".to_string(),
            expires_at: None,
            user_id: owner.to_string(),
            created_at: Some(created_at),
        })
        .await
        .unwrap()
}

pub fn bearer(user: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", user)).unwrap()
}

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = PEER_ADDR.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
