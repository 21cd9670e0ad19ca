//! Link entity representing a bio entry / shortened destination.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::AppError;

/// A registered link with its denormalized click counter.
///
/// `id` is assigned by the store and never changes. `expires_at: None` means the
/// link never expires. `clicks` only ever grows, and only through
/// [`crate::domain::repositories::LinkRepository::increment_clicks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub clicks: i64,
    pub user_id: String,
}

impl Link {
    /// Creates a new Link instance.
    pub fn new(
        id: i64,
        title: String,
        url: String,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        clicks: i64,
        user_id: String,
    ) -> Self {
        Self {
            id,
            title,
            url,
            created_at,
            expires_at,
            clicks,
            user_id,
        }
    }

    /// Returns true if the expiration is set and strictly before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| e < now)
    }

    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Input data for creating a new link.
///
/// The store fills in `id`, `clicks = 0` and, when `created_at` is `None`,
/// the creation timestamp.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub title: String,
    pub url: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial update for an existing link.
///
/// `None` fields are left unchanged. There is no way to clear an expiration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LinkPatch {
    /// Builds a patch, treating empty or whitespace-only strings as absent.
    pub fn new(
        title: Option<String>,
        url: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        fn non_empty(s: Option<String>) -> Option<String> {
            s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        Self {
            title: non_empty(title),
            url: non_empty(url),
            expires_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.expires_at.is_none()
    }
}

/// Resolves a caller-supplied identifier into a link id.
///
/// # Errors
///
/// Returns [`AppError::InvalidId`] unless `raw` is a positive integer.
pub fn parse_link_id(raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::invalid_id(
            "Invalid link ID format",
            json!({ "id": raw }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link_expiring(expires_at: Option<DateTime<Utc>>) -> Link {
        Link::new(
            1,
            "Test".to_string(),
            "https://example.com".to_string(),
            Utc::now(),
            expires_at,
            0,
            "user-1".to_string(),
        )
    }

    #[test]
    fn test_link_creation() {
        let now = Utc::now();
        let link = Link::new(
            7,
            "Docs".to_string(),
            "https://docs.rs".to_string(),
            now,
            None,
            3,
            "alice".to_string(),
        );

        assert_eq!(link.id, 7);
        assert_eq!(link.title, "Docs");
        assert_eq!(link.url, "https://docs.rs");
        assert_eq!(link.created_at, now);
        assert_eq!(link.clicks, 3);
        assert_eq!(link.user_id, "alice");
        assert!(!link.is_expired());
    }

    #[test]
    fn test_link_without_expiry_never_expires() {
        let link = link_expiring(None);
        assert!(!link.is_expired_at(Utc::now() + Duration::days(365 * 100)));
    }

    #[test]
    fn test_link_is_expired() {
        let link = link_expiring(Some(Utc::now() - Duration::seconds(1)));
        assert!(link.is_expired());
    }

    #[test]
    fn test_link_expiry_is_strict() {
        let at = Utc::now();
        let link = link_expiring(Some(at));
        assert!(!link.is_expired_at(at));
        assert!(link.is_expired_at(at + Duration::milliseconds(1)));
    }

    #[test]
    fn test_patch_drops_empty_strings() {
        let patch = LinkPatch::new(Some("  ".to_string()), Some(String::new()), None);
        assert!(patch.is_empty());

        let patch = LinkPatch::new(Some(" New title ".to_string()), None, None);
        assert_eq!(patch.title.as_deref(), Some("New title"));
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_parse_link_id() {
        assert_eq!(parse_link_id("42").unwrap(), 42);
        assert_eq!(parse_link_id(" 42 ").unwrap(), 42);

        for raw in ["", "abc", "0", "-5", "4.2", "99999999999999999999"] {
            assert!(
                matches!(parse_link_id(raw), Err(AppError::InvalidId { .. })),
                "{raw:?} should be rejected"
            );
        }
    }
}
