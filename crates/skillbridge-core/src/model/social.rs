// ── Profiles and connections ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member's public profile, as returned by people search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bio: String,
}

/// Lifecycle of a connection request between two members.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

/// An edge in the connection graph. `requester_id` sent the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub requester_id: String,
    pub recipient_id: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// The other member of this edge, from `me`'s point of view.
    pub fn peer_of<'a>(&'a self, me: &str) -> &'a str {
        if self.requester_id == me {
            &self.recipient_id
        } else {
            &self.requester_id
        }
    }

    /// Whether this edge involves `user_id` at either end.
    pub fn involves(&self, user_id: &str) -> bool {
        self.requester_id == user_id || self.recipient_id == user_id
    }
}

/// Insert body for a new connection request. The store assigns `id`,
/// `created_at`, and the initial `pending` status.
#[derive(Debug, Clone, Serialize)]
pub struct NewConnection {
    pub requester_id: String,
    pub recipient_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_resolution_is_symmetric() {
        let edge = Connection {
            id: "conn-1".into(),
            requester_id: "u-1".into(),
            recipient_id: "u-2".into(),
            status: ConnectionStatus::Pending,
            created_at: Utc::now(),
        };

        assert_eq!(edge.peer_of("u-1"), "u-2");
        assert_eq!(edge.peer_of("u-2"), "u-1");
        assert!(edge.involves("u-1"));
        assert!(!edge.involves("u-3"));
    }
}
