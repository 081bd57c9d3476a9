use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FeedSource;

/// Persisted news item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    /// Owning feed source (NULL only if the source was removed)
    pub feed_source_id: Option<i64>,
    pub title: String,
    /// Plain text with HTML entities decoded
    pub description: Option<String>,
    pub link: String,
    pub publication_date: DateTime<Utc>,
    /// Set once fan-out has processed every recipient
    pub notifications_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// Article to insert together with its matched instruments
#[derive(Debug, Clone)]
pub struct CreateArticle {
    pub feed_source_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub link: String,
    pub publication_date: DateTime<Utc>,
    /// Must be non-empty; articles without instruments are never stored
    pub symbols: Vec<String>,
}

/// Unsent article loaded for fan-out, with everything needed to notify.
#[derive(Debug, Clone)]
pub struct PendingArticle {
    pub article: Article,
    /// Matched instrument symbols, ascending
    pub symbols: Vec<String>,
    pub feed_source: Option<FeedSource>,
}
