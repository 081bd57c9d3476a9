use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry of a feed document, normalised across RSS and Atom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    /// Raw description as published; may contain HTML markup or entities.
    pub description: Option<String>,
    pub link: String,
    /// `<category>` text (RSS) or `term` attribute (Atom).
    pub categories: Vec<String>,
    pub published: Option<DateTime<Utc>>,
}
