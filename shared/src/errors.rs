use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Reply transport error: {0}")]
    Transport(String),

    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Whether the failure happened while delivering a reply, after the
    /// workflow state had already been updated.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, ServiceError::Transport(_) | ServiceError::Telegram(_))
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
