//! DTOs for visit listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::Visit;

/// JSON representation of a recorded visit.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitResponse {
    pub id: String,
    pub link_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub ip: String,
    pub referrer: String,
}

impl From<Visit> for VisitResponse {
    fn from(visit: Visit) -> Self {
        Self {
            id: visit.id.to_string(),
            link_id: visit.link_id.to_string(),
            timestamp: visit.visited_at,
            user_agent: visit.user_agent,
            ip: visit.ip,
            referrer: visit.referrer,
        }
    }
}
