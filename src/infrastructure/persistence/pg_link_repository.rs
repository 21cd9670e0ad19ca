//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Row shape shared by every `links` query.
#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    title: String,
    url: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    clicks: i64,
    user_id: String,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link::new(
            r.id,
            r.title,
            r.url,
            r.created_at,
            r.expires_at,
            r.clicks,
            r.user_id,
        )
    }
}

/// PostgreSQL repository for link storage.
///
/// Counter increments and expiry sweeps are single SQL statements, so they stay
/// correct under concurrent redirects without application-level locking.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    ///
    /// Expects the schema and indexes from `migrations/` to be applied.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let created_at = new_link.created_at.unwrap_or_else(Utc::now);

        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            INSERT INTO links (title, url, created_at, expires_at, clicks, user_id)
            VALUES ($1, $2, $3, $4, 0, $5)
            RETURNING id, title, url, created_at, expires_at, clicks, user_id
            "#,
        )
        .bind(&new_link.title)
        .bind(&new_link.url)
        .bind(created_at)
        .bind(new_link.expires_at)
        .bind(&new_link.user_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, title, url, created_at, expires_at, clicks, user_id
            FROM links
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn list_by_owner(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Link>, AppError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, title, url, created_at, expires_at, clicks, user_id
            FROM links
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links SET
                title      = COALESCE($2::TEXT, title),
                url        = COALESCE($3::TEXT, url),
                expires_at = COALESCE($4::TIMESTAMPTZ, expires_at)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.url)
        .bind(patch.expires_at)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Link not found", json!({ "id": id })));
        }

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM links
            WHERE expires_at IS NOT NULL
              AND expires_at < $1
            "#,
        )
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn increment_clicks(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE links SET clicks = clicks + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}
