// ── Chat message domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;

/// One message in a chat room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Message {
    const RESOURCE: &'static str = "messages";

    fn key(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Insert body for a new message. The store assigns `id` and
/// `created_at`; the confirmed row comes back in the response.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub room_id: String,
    pub sender_id: String,
    pub content: String,
}
