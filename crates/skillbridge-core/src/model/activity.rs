// ── Activity feed domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;

/// One entry in the community activity feed
/// ("Dana applied to Teach knitting").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    pub action: String,
    #[serde(default)]
    pub target: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Activity {
    const RESOURCE: &'static str = "activities";

    fn key(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
