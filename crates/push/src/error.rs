use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Push gateway rejected request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),
}
