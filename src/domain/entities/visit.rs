//! Visit entity representing a single redirect event.

use chrono::{DateTime, Utc};

/// An immutable record of one redirect against a link.
///
/// `link_id` referenced an existing link when the visit was recorded. Deleting
/// the link later leaves its visits in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub id: i64,
    pub link_id: i64,
    pub visited_at: DateTime<Utc>,
    pub user_agent: String,
    pub ip: String,
    pub referrer: String,
}

/// Input data for appending a visit to the log.
///
/// `visited_at` is captured by the recorder when the redirect is accepted,
/// not when the write lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisit {
    pub link_id: i64,
    pub visited_at: DateTime<Utc>,
    pub user_agent: String,
    pub ip: String,
    pub referrer: String,
}

/// Client metadata captured from an inbound redirect request.
///
/// Missing headers are represented as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: String,
    pub ip: String,
    pub referrer: String,
}

impl ClientInfo {
    pub fn new(
        user_agent: impl Into<String>,
        ip: impl Into<String>,
        referrer: impl Into<String>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            ip: ip.into(),
            referrer: referrer.into(),
        }
    }

    /// Builds the visit record for `link_id` at `visited_at`.
    pub fn into_visit(self, link_id: i64, visited_at: DateTime<Utc>) -> NewVisit {
        NewVisit {
            link_id,
            visited_at,
            user_agent: self.user_agent,
            ip: self.ip,
            referrer: self.referrer,
        }
    }
}
