// ── Notification domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;

/// An in-app notification addressed to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    /// Notification category, e.g. `"application"`, `"connection"`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Key of the row this notification points at, if any.
    #[serde(default)]
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Notification {
    const RESOURCE: &'static str = "notifications";

    fn key(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
