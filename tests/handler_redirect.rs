mod common;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use chrono::{DateTime, Duration, Utc};
use linkbio::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Link store whose click counter is unavailable.
struct BrokenCounterLinkRepository {
    inner: Arc<MemoryLinkRepository>,
}

#[async_trait]
impl LinkRepository for BrokenCounterLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        self.inner.create(new_link).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        self.inner.find_by_id(id).await
    }

    async fn list_by_owner(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Link>, AppError> {
        self.inner.list_by_owner(user_id, limit, offset).await
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<(), AppError> {
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        self.inner.delete(id).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        self.inner.delete_expired(now).await
    }

    async fn increment_clicks(&self, _: i64) -> Result<bool, AppError> {
        Err(AppError::storage("Database error", json!({})))
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }
}

/// Visit log that takes `delay` to accept each append.
struct SlowVisitRepository {
    inner: Arc<MemoryVisitRepository>,
    delay: std::time::Duration,
}

#[async_trait]
impl VisitRepository for SlowVisitRepository {
    async fn create(&self, new_visit: NewVisit) -> Result<Visit, AppError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create(new_visit).await
    }

    async fn list_by_link(
        &self,
        link_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Visit>, AppError> {
        self.inner.list_by_link(link_id, limit, offset).await
    }
}

fn slow_visit_app(delay: std::time::Duration) -> common::TestApp {
    let links = Arc::new(MemoryLinkRepository::new());
    let visits = Arc::new(MemoryVisitRepository::new());
    let slow = Arc::new(SlowVisitRepository {
        inner: visits.clone(),
        delay,
    });
    common::create_test_app_with(links.clone(), visits, links, slow)
}

fn short_request_timeout() -> RouterOptions {
    RouterOptions {
        request_timeout: std::time::Duration::from_millis(300),
        ..common::test_router_options()
    }
}

#[tokio::test]
async fn test_redirect_success() {
    let app = common::create_test_app();
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Blog",
        "https://blog.example.com",
        None,
    )
    .await;

    let response = server.get(&format!("/visit/{}", link.id)).await;

    response.assert_status(StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://blog.example.com"
    );
}

#[tokio::test]
async fn test_redirect_increments_clicks_and_logs_visit() {
    let app = common::create_test_app();
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Blog",
        "https://blog.example.com",
        None,
    )
    .await;

    for _ in 0..3 {
        server
            .get(&format!("/visit/{}", link.id))
            .await
            .assert_status(StatusCode::FOUND);
    }

    let stored = app.links.find_by_id(link.id).await.unwrap().unwrap();
    assert_eq!(stored.clicks, 3);

    let visits = app.visits.list_by_link(link.id, 10, 0).await.unwrap();
    assert_eq!(visits.len(), 3);
}

#[tokio::test]
async fn test_redirect_captures_client_metadata() {
    let app = common::create_test_app();
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Shop",
        "https://shop.example.com",
        None,
    )
    .await;

    server
        .get(&format!("/visit/{}", link.id))
        .add_header(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (X11)"))
        .add_header(header::REFERER, HeaderValue::from_static("https://social.example/u/alice"))
        .await
        .assert_status(StatusCode::FOUND);

    let visits = app.visits.list_by_link(link.id, 10, 0).await.unwrap();
    assert_eq!(visits.len(), 1);

    let visit = &visits[0];
    assert_eq!(visit.link_id, link.id);
    assert_eq!(visit.user_agent, "Mozilla/5.0 (X11)");
    assert_eq!(visit.referrer, "https://social.example/u/alice");
    assert_eq!(visit.ip, "127.0.0.1");
}

#[tokio::test]
async fn test_redirect_missing_headers_recorded_as_empty() {
    let app = common::create_test_app();
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Shop",
        "https://shop.example.com",
        None,
    )
    .await;

    server
        .get(&format!("/visit/{}", link.id))
        .await
        .assert_status(StatusCode::FOUND);

    let visits = app.visits.list_by_link(link.id, 10, 0).await.unwrap();
    assert_eq!(visits[0].referrer, "");
}

#[tokio::test]
async fn test_redirect_ignores_forwarded_for_when_not_behind_proxy() {
    let app = common::create_test_app();
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Shop",
        "https://shop.example.com",
        None,
    )
    .await;

    server
        .get(&format!("/visit/{}", link.id))
        .add_header(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("203.0.113.9"),
        )
        .await
        .assert_status(StatusCode::FOUND);

    let visits = app.visits.list_by_link(link.id, 10, 0).await.unwrap();
    assert_eq!(visits[0].ip, "127.0.0.1");
}

#[tokio::test]
async fn test_redirect_not_found() {
    let app = common::create_test_app();
    let server = app.server();

    let response = server.get("/visit/999").await;

    response.assert_status_not_found();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "not_found");
    assert_eq!(json["error"]["message"], "Link not found or expired");
}

#[tokio::test]
async fn test_redirect_invalid_id_is_not_found() {
    let app = common::create_test_app();
    let server = app.server();

    for id in ["abc", "0", "-5"] {
        server
            .get(&format!("/visit/{}", id))
            .await
            .assert_status_not_found();
    }

    assert!(app.visits.is_empty().await);
}

#[tokio::test]
async fn test_redirect_expired_link() {
    let app = common::create_test_app();
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Old promo",
        "https://promo.example.com",
        Some(Utc::now() - Duration::hours(1)),
    )
    .await;

    let response = server.get(&format!("/visit/{}", link.id)).await;

    response.assert_status_not_found();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["message"], "Link not found or expired");

    let stored = app.links.find_by_id(link.id).await.unwrap().unwrap();
    assert_eq!(stored.clicks, 0);
    assert!(app.visits.is_empty().await);
}

#[tokio::test]
async fn test_expired_and_unknown_links_are_indistinguishable() {
    let app = common::create_test_app();
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Old promo",
        "https://promo.example.com",
        Some(Utc::now() - Duration::minutes(5)),
    )
    .await;

    let expired = server.get(&format!("/visit/{}", link.id)).await;
    let unknown = server.get("/visit/424242").await;

    assert_eq!(expired.status_code(), unknown.status_code());
    assert_eq!(
        expired.json::<serde_json::Value>(),
        unknown.json::<serde_json::Value>()
    );
}

#[tokio::test]
async fn test_redirect_future_expiry_still_redirects() {
    let app = common::create_test_app();
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Sale",
        "https://sale.example.com",
        Some(Utc::now() + Duration::days(1)),
    )
    .await;

    server
        .get(&format!("/visit/{}", link.id))
        .await
        .assert_status(StatusCode::FOUND);
}

#[tokio::test]
async fn test_redirect_does_not_require_auth() {
    let app = common::create_test_app();
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "bob",
        "Home",
        "https://bob.example.com",
        None,
    )
    .await;

    let response = server.get(&format!("/visit/{}", link.id)).await;

    assert_ne!(response.status_code(), StatusCode::UNAUTHORIZED);
    response.assert_status(StatusCode::FOUND);
}

#[tokio::test]
async fn test_counter_failure_is_500_without_location() {
    let links = Arc::new(MemoryLinkRepository::new());
    let visits = Arc::new(MemoryVisitRepository::new());
    let broken = Arc::new(BrokenCounterLinkRepository {
        inner: links.clone(),
    });
    let app = common::create_test_app_with(links.clone(), visits.clone(), broken, visits);
    let server = app.server();

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Blog",
        "https://blog.example.com",
        None,
    )
    .await;

    let response = server.get(&format!("/visit/{}", link.id)).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::LOCATION).is_none());

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "internal_error");

    let stored = app.links.find_by_id(link.id).await.unwrap().unwrap();
    assert_eq!(stored.clicks, 0);

    // The visit write was already under way and still lands.
    assert!(app.visit_service.drain(std::time::Duration::from_secs(5)).await);
    assert_eq!(app.visits.list_by_link(link.id, 10, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_slow_visit_write_redirects_before_request_timeout() {
    let mut app = slow_visit_app(std::time::Duration::from_secs(2));
    app.state.visit_wait = std::time::Duration::from_millis(100);
    let server = app.server_with(&short_request_timeout());

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Blog",
        "https://blog.example.com",
        None,
    )
    .await;

    let started = Instant::now();
    let response = server.get(&format!("/visit/{}", link.id)).await;

    response.assert_status(StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://blog.example.com"
    );
    assert!(started.elapsed() < std::time::Duration::from_millis(300));

    let stored = app.links.find_by_id(link.id).await.unwrap().unwrap();
    assert_eq!(stored.clicks, 1);
    assert!(app.visits.list_by_link(link.id, 10, 0).await.unwrap().is_empty());

    assert!(app.visit_service.drain(std::time::Duration::from_secs(5)).await);
    assert_eq!(app.visits.list_by_link(link.id, 10, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_request_timeout_never_turns_counted_visit_into_error() {
    let app = slow_visit_app(std::time::Duration::from_secs(1));
    let server = app.server_with(&short_request_timeout());

    let link = common::seed_link(
        app.links.as_ref(),
        "alice",
        "Blog",
        "https://blog.example.com",
        None,
    )
    .await;

    let response = server.get(&format!("/visit/{}", link.id)).await;

    assert_ne!(response.status_code(), StatusCode::REQUEST_TIMEOUT);
    response.assert_status(StatusCode::FOUND);
    assert!(response.headers().get(header::LOCATION).is_some());

    let stored = app.links.find_by_id(link.id).await.unwrap().unwrap();
    assert_eq!(stored.clicks, 1);
}
