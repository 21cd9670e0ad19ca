//! Link management service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::entities::{Link, LinkPatch, NewLink, parse_link_id};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::url_validator::validate_destination_url;

/// Service for creating, reading, updating and deleting links.
///
/// A thin layer over [`LinkRepository`]: it resolves caller-supplied ids and
/// validates titles and destination URLs before they reach the store.
pub struct LinkService {
    link_repository: Arc<dyn LinkRepository>,
}

impl LinkService {
    /// Creates a new link service.
    pub fn new(link_repository: Arc<dyn LinkRepository>) -> Self {
        Self { link_repository }
    }

    /// Creates a link owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the title is blank or the URL is not an
    /// absolute `http`/`https` URL.
    /// Returns [`AppError::Storage`] if the write fails.
    pub async fn create_link(
        &self,
        user_id: &str,
        title: String,
        url: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError> {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::bad_request(
                "Title must not be empty",
                json!({ "field": "title" }),
            ));
        }

        let url = url.trim().to_string();
        check_url(&url)?;

        let new_link = NewLink {
            title,
            url,
            expires_at,
            user_id: user_id.to_string(),
            created_at: None,
        };

        let link = self.link_repository.create(new_link).await?;
        tracing::info!(link_id = link.id, user_id, "Link created");

        Ok(link)
    }

    /// Retrieves a link by its external id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidId`] for a malformed id.
    /// Returns [`AppError::NotFound`] if no link has this id.
    pub async fn get_link(&self, id: &str) -> Result<Link, AppError> {
        let id = parse_link_id(id)?;

        self.link_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))
    }

    /// Lists links owned by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on database errors.
    pub async fn list_links(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Link>, AppError> {
        self.link_repository
            .list_by_owner(user_id, limit, offset)
            .await
    }

    /// Applies a partial update. Absent fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidId`] for a malformed id.
    /// Returns [`AppError::Validation`] if a supplied URL is invalid.
    /// Returns [`AppError::NotFound`] if no link has this id.
    pub async fn update_link(&self, id: &str, patch: LinkPatch) -> Result<(), AppError> {
        let id = parse_link_id(id)?;

        if let Some(url) = &patch.url {
            check_url(url)?;
        }

        self.link_repository.update(id, patch).await?;
        tracing::info!(link_id = id, "Link updated");

        Ok(())
    }

    /// Deletes a link. Visits recorded against it are kept.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidId`] for a malformed id.
    /// Returns [`AppError::NotFound`] if nothing was deleted.
    pub async fn delete_link(&self, id: &str) -> Result<(), AppError> {
        let id = parse_link_id(id)?;

        if !self.link_repository.delete(id).await? {
            return Err(AppError::not_found(
                "Link not found or already deleted",
                json!({ "id": id }),
            ));
        }

        tracing::info!(link_id = id, "Link deleted");
        Ok(())
    }

    /// Checks that the link store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.link_repository.ping().await
    }
}

fn check_url(url: &str) -> Result<(), AppError> {
    validate_destination_url(url).map_err(|e| {
        AppError::bad_request(
            "Invalid URL format",
            json!({ "field": "url", "reason": e.to_string() }),
        )
    })
}
