use thiserror::Error;

/// Errors raised while assembling a pipeline, before any run starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
  /// Two steps declare the same output key.
  #[error("output key '{key}' is written by both '{first}' and '{second}'")]
  KeyCollision {
    key: String,
    first: String,
    second: String,
  },

  /// A step writes a key the run is seeded with.
  #[error("output key '{key}' of step '{step}' collides with an input key")]
  InputKeyCollision { key: String, step: String },

  /// Two nodes share a name.
  #[error("duplicate node name: {name}")]
  DuplicateName { name: String },

  /// A node is malformed on its own.
  #[error("invalid node '{node}': {message}")]
  InvalidNode { node: String, message: String },
}

impl WorkflowError {
  /// True for both flavours of output key collision.
  pub fn is_key_collision(&self) -> bool {
    matches!(
      self,
      WorkflowError::KeyCollision { .. } | WorkflowError::InputKeyCollision { .. }
    )
  }
}
