use braid_workflow::WorkflowError;
use thiserror::Error;

/// Errors that can occur during pipeline resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// No factory is registered under the step's `uses` name.
  #[error("step '{step}' uses unknown step kind '{uses}'")]
  UnknownStep { step: String, uses: String },

  /// The factory rejected the step definition (bad params and the like).
  #[error("failed to construct step '{step}': {message}")]
  StepConstruction { step: String, message: String },

  /// The assembled tree failed validation.
  #[error(transparent)]
  Workflow(#[from] WorkflowError),
}
