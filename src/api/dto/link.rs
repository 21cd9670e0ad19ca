//! DTOs for link management endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::{Link, LinkPatch};

/// Request body for `POST /api/links`.
///
/// The owner is taken from the bearer token, never from the body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    #[validate(url(message = "Invalid URL format"))]
    pub url: String,

    /// Absent or `null` means the link never expires.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request body for `PUT /api/links/{id}`.
///
/// Only provided, non-empty fields are changed. An expiration can be set or
/// moved, not cleared.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinkRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<UpdateLinkRequest> for LinkPatch {
    fn from(req: UpdateLinkRequest) -> Self {
        LinkPatch::new(req.title, req.url, req.expires_at)
    }
}

/// JSON representation of a link.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub clicks: i64,
    pub user_id: String,
}

impl From<Link> for LinkResponse {
    fn from(link: Link) -> Self {
        Self {
            id: link.id.to_string(),
            title: link.title,
            url: link.url,
            created_at: link.created_at,
            expires_at: link.expires_at,
            clicks: link.clicks,
            user_id: link.user_id,
        }
    }
}
