use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} when fetching {url}")]
    Status { status: u16, url: String },

    #[error("Failed to parse feed: {0}")]
    Parse(String),
}

impl FeedError {
    /// Transport-level failures are retried on the next tick; parse failures
    /// usually need the publisher to fix the document.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Network(_) | FeedError::Status { .. })
    }
}
