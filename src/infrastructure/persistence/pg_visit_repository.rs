//! PostgreSQL implementation of visit repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewVisit, Visit};
use crate::domain::repositories::VisitRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct VisitRow {
    id: i64,
    link_id: i64,
    visited_at: DateTime<Utc>,
    user_agent: String,
    ip: String,
    referrer: String,
}

impl From<VisitRow> for Visit {
    fn from(r: VisitRow) -> Self {
        Visit {
            id: r.id,
            link_id: r.link_id,
            visited_at: r.visited_at,
            user_agent: r.user_agent,
            ip: r.ip,
            referrer: r.referrer,
        }
    }
}

/// PostgreSQL repository for the visit log.
///
/// `visits.link_id` carries no foreign key, so visits survive deletion of their link.
pub struct PgVisitRepository {
    pool: Arc<PgPool>,
}

impl PgVisitRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisitRepository for PgVisitRepository {
    async fn create(&self, new_visit: NewVisit) -> Result<Visit, AppError> {
        let row = sqlx::query_as::<_, VisitRow>(
            r#"
            INSERT INTO visits (link_id, visited_at, user_agent, ip, referrer)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, link_id, visited_at, user_agent, ip, referrer
            "#,
        )
        .bind(new_visit.link_id)
        .bind(new_visit.visited_at)
        .bind(&new_visit.user_agent)
        .bind(&new_visit.ip)
        .bind(&new_visit.referrer)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn list_by_link(
        &self,
        link_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Visit>, AppError> {
        let rows = sqlx::query_as::<_, VisitRow>(
            r#"
            SELECT id, link_id, visited_at, user_agent, ip, referrer
            FROM visits
            WHERE link_id = $1
            ORDER BY visited_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(link_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Visit::from).collect())
    }
}
