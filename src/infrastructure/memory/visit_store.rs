//! In-memory visit log.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::domain::entities::{NewVisit, Visit};
use crate::domain::repositories::VisitRepository;
use crate::error::AppError;

/// Append-only visit log kept in a `Vec`.
pub struct MemoryVisitRepository {
    visits: RwLock<Vec<Visit>>,
    next_id: AtomicI64,
}

impl MemoryVisitRepository {
    pub fn new() -> Self {
        Self {
            visits: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Total number of visits recorded, across all links.
    pub async fn len(&self) -> usize {
        self.visits.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.visits.read().await.is_empty()
    }
}

impl Default for MemoryVisitRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisitRepository for MemoryVisitRepository {
    async fn create(&self, new_visit: NewVisit) -> Result<Visit, AppError> {
        let visit = Visit {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            link_id: new_visit.link_id,
            visited_at: new_visit.visited_at,
            user_agent: new_visit.user_agent,
            ip: new_visit.ip,
            referrer: new_visit.referrer,
        };

        self.visits.write().await.push(visit.clone());
        Ok(visit)
    }

    async fn list_by_link(
        &self,
        link_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Visit>, AppError> {
        let mut matching: Vec<Visit> = self
            .visits
            .read()
            .await
            .iter()
            .filter(|v| v.link_id == link_id)
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.visited_at.cmp(&a.visited_at));

        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}
