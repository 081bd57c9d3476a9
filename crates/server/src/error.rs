use thiserror::Error;

/// Service-level error for the news pipeline.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Feed error: {0}")]
    Feed(#[from] feed::FeedError),

    #[error("Push error: {0}")]
    Push(#[from] push::PushError),

    #[error("Settings error: {0}")]
    Settings(#[from] crate::services::SettingsError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
