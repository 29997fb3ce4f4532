//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid Bilibili video URL: {0}")]
    InvalidVideoUrl(String),

    #[error("Invalid task status: {0}")]
    InvalidStatus(String),

    #[error("Invalid timestamp in {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}
