//! Queue error types.

use btq_models::ModelError;
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid Bilibili video URL: {0}")]
    InvalidVideoUrl(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Corrupt task record {task_id}: {source}")]
    CorruptTask {
        task_id: String,
        #[source]
        source: ModelError,
    },

    #[error("Store rejected command: {0}")]
    Store(String),

    #[error("Unexpected store reply: {0}")]
    UnexpectedReply(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl QueueError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn unexpected_reply(msg: impl Into<String>) -> Self {
        Self::UnexpectedReply(msg.into())
    }

    /// Whether the failure came from the backing store (as opposed to the
    /// caller's input).
    pub fn is_store_failure(&self) -> bool {
        !matches!(self, QueueError::InvalidVideoUrl(_) | QueueError::TaskNotFound(_))
    }
}
