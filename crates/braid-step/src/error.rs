//! Step and context error types.

use thiserror::Error;

/// Errors a step may return from [`crate::Step::execute`].
#[derive(Debug, Error)]
pub enum StepError {
  /// The step's own logic failed.
  #[error("{message}")]
  Failed { message: String },

  /// A value the step read did not have the expected shape.
  #[error("invalid input '{key}': {message}")]
  InvalidInput { key: String, message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The step observed its cancellation token and stopped.
  #[error("step cancelled")]
  Cancelled,
}

impl StepError {
  pub fn failed(message: impl Into<String>) -> Self {
    StepError::Failed {
      message: message.into(),
    }
  }

  pub fn invalid_input(key: impl Into<String>, message: impl Into<String>) -> Self {
    StepError::InvalidInput {
      key: key.into(),
      message: message.into(),
    }
  }
}

/// Errors raised by [`crate::Context`] mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
  /// Keys are append-only; an existing key is never overwritten.
  #[error("context already contains key '{key}'")]
  DuplicateKey { key: String },
}
