use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External publisher of syndicated news entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: i64,
    /// Display name, used in notification bodies
    pub title: String,
    pub site_url: String,
    pub feed_url: String,
    /// System-curated source (as opposed to user-added)
    pub is_built_in: bool,
    /// Last time ingestion polled this source; drives rotation order
    pub last_polled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeedSource {
    pub title: String,
    #[serde(default)]
    pub site_url: String,
    pub feed_url: String,
    #[serde(default)]
    pub is_built_in: bool,
}

/// Rotation queue a feed source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    BuiltIn,
    UserAdded,
}

impl SourceOrigin {
    pub fn is_built_in(self) -> bool {
        matches!(self, Self::BuiltIn)
    }

    pub fn other(self) -> Self {
        match self {
            Self::BuiltIn => Self::UserAdded,
            Self::UserAdded => Self::BuiltIn,
        }
    }
}
