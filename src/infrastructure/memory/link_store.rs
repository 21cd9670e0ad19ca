//! In-memory link store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Link store backed by a `HashMap` behind a single `RwLock`.
///
/// Each mutating call holds the write lock for its whole duration, which gives
/// increments and the expiry sweep the same atomicity the SQL statements have.
pub struct MemoryLinkRepository {
    links: RwLock<HashMap<i64, Link>>,
    next_id: AtomicI64,
}

impl MemoryLinkRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        debug!("Using in-memory link store");
        Self {
            links: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of links currently stored.
    pub async fn len(&self) -> usize {
        self.links.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.links.read().await.is_empty()
    }
}

impl Default for MemoryLinkRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let link = Link::new(
            id,
            new_link.title,
            new_link.url,
            new_link.created_at.unwrap_or_else(Utc::now),
            new_link.expires_at,
            0,
            new_link.user_id,
        );

        self.links.write().await.insert(id, link.clone());
        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        Ok(self.links.read().await.get(&id).cloned())
    }

    async fn list_by_owner(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Link>, AppError> {
        let mut owned: Vec<Link> = self
            .links
            .read()
            .await
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();

        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<(), AppError> {
        let mut links = self.links.write().await;
        let link = links
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;

        if let Some(title) = patch.title {
            link.title = title;
        }
        if let Some(url) = patch.url {
            link.url = url;
        }
        if let Some(expires_at) = patch.expires_at {
            link.expires_at = Some(expires_at);
        }

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.links.write().await.remove(&id).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut links = self.links.write().await;
        let before = links.len();
        links.retain(|_, link| !link.is_expired_at(now));

        Ok((before - links.len()) as u64)
    }

    async fn increment_clicks(&self, id: i64) -> Result<bool, AppError> {
        match self.links.write().await.get_mut(&id) {
            Some(link) => {
                link.clicks += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_link(title: &str, user_id: &str, expires_at: Option<DateTime<Utc>>) -> NewLink {
        NewLink {
            title: title.to_string(),
            url: "https://example.com".to_string(),
            expires_at,
            user_id: user_id.to_string(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamp() {
        let repo = MemoryLinkRepository::new();
        let before = Utc::now();

        let first = repo.create(new_link("a", "u1", None)).await.unwrap();
        let second = repo.create(new_link("b", "u1", None)).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.clicks, 0);
        assert!(first.created_at >= before);
    }

    #[tokio::test]
    async fn test_create_then_find_round_trip() {
        let repo = MemoryLinkRepository::new();
        let created = repo
            .create(new_link("Test", "u1", Some(Utc::now() + Duration::days(1))))
            .await
            .unwrap();

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first_with_paging() {
        let repo = MemoryLinkRepository::new();
        let base = Utc::now();

        for i in 0..5 {
            let mut link = new_link(&format!("link-{i}"), "owner", None);
            link.created_at = Some(base + Duration::seconds(i));
            repo.create(link).await.unwrap();
        }
        repo.create(new_link("other", "someone-else", None))
            .await
            .unwrap();

        let page = repo.list_by_owner("owner", 2, 1).await.unwrap();
        let titles: Vec<_> = page.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["link-3", "link-2"]);
    }

    #[tokio::test]
    async fn test_update_applies_only_present_fields() {
        let repo = MemoryLinkRepository::new();
        let link = repo.create(new_link("Old", "u1", None)).await.unwrap();

        let patch = LinkPatch::new(Some("New".to_string()), None, None);
        repo.update(link.id, patch).await.unwrap();

        let updated = repo.find_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.url, link.url);
        assert_eq!(updated.expires_at, None);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = MemoryLinkRepository::new();
        let result = repo.update(99, LinkPatch::default()).await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_reports_whether_removed() {
        let repo = MemoryLinkRepository::new();
        let link = repo.create(new_link("x", "u1", None)).await.unwrap();

        assert!(repo.delete(link.id).await.unwrap());
        assert!(!repo.delete(link.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired_is_strict() {
        let repo = MemoryLinkRepository::new();
        let now = Utc::now();

        repo.create(new_link("past", "u1", Some(now - Duration::hours(1))))
            .await
            .unwrap();
        let boundary = repo
            .create(new_link("boundary", "u1", Some(now)))
            .await
            .unwrap();
        let future = repo
            .create(new_link("future", "u1", Some(now + Duration::hours(1))))
            .await
            .unwrap();
        let never = repo.create(new_link("never", "u1", None)).await.unwrap();

        assert_eq!(repo.delete_expired(now).await.unwrap(), 1);
        assert_eq!(repo.len().await, 3);
        for id in [boundary.id, future.id, never.id] {
            assert!(repo.find_by_id(id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_increment_missing_link_reports_false() {
        let repo = MemoryLinkRepository::new();
        assert!(!repo.increment_clicks(1).await.unwrap());
        assert!(repo.is_empty().await);
    }
}
