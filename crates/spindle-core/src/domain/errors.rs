//! TaskError - callable が返すエラーの分類
//!
//! supervisor はこの variant だけを見て exit code を決める。
//! timeout / cancellation は supervisor 自身が検出するのでここには無い。

use thiserror::Error;

/// Message reported for application errors raised without one.
pub const DEFAULT_RAISED_MESSAGE: &str = "No message";

#[derive(Debug, Error)]
pub enum TaskError {
    /// Deliberate application-level failure raised by the task (exit code 2).
    #[error("task raised: {}", .message.as_deref().unwrap_or(DEFAULT_RAISED_MESSAGE))]
    Raised { message: Option<String> },

    /// The callable or its arguments were malformed (exit code 1).
    #[error("attribute error: {0}")]
    Attribute(String),

    /// Anything else (exit code 1).
    #[error("{0}")]
    Failed(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised {
            message: Some(message.into()),
        }
    }

    pub fn raised_without_message() -> Self {
        Self::Raised { message: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Failed(message.into())
    }

    /// Message propagated in the result tuple for application errors.
    pub fn raised_message(&self) -> Option<&str> {
        match self {
            TaskError::Raised { message } => {
                Some(message.as_deref().unwrap_or(DEFAULT_RAISED_MESSAGE))
            }
            _ => None,
        }
    }
}
