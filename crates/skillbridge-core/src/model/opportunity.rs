// ── Opportunity and completion domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;

/// A posted request for (or offer of) help.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub spots: u32,
    #[serde(default)]
    pub urgency: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Opportunity {
    const RESOURCE: &'static str = "opportunities";

    fn key(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Completion state of an opportunity, tracked in its own resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum CompletionStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Record marking an opportunity as worked on / finished.
///
/// A completion with status `completed` hides its opportunity from the
/// active board, even though it arrives on a different resource's feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub id: String,
    pub opportunity_id: String,
    #[serde(default)]
    pub volunteer_id: String,
    #[serde(default)]
    pub organizer_id: String,
    pub status: CompletionStatus,
    #[serde(default)]
    pub hours_spent: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Completion {
    const RESOURCE: &'static str = "completions";

    fn key(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
