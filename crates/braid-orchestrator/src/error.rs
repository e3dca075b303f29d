//! Run errors.

use braid_step::StepError;

/// Errors that can end a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
  /// A step's declared dependency or back-reference was absent when it ran.
  #[error("step '{step}' is missing dependency '{key}'")]
  MissingDependency { step: String, key: String },

  /// The step's own logic failed.
  #[error("step '{step}' failed: {source}")]
  StepFailure {
    step: String,
    #[source]
    source: StepError,
  },

  /// One or more branches of a parallel group failed.
  #[error(transparent)]
  Aggregate(#[from] AggregateError),

  /// The caller cancelled the run.
  #[error("run cancelled")]
  Cancelled,

  /// The seed context already holds a key the pipeline writes.
  #[error("input key '{key}' is also written by the pipeline")]
  SeedCollision { key: String },

  /// The step panicked while executing.
  #[error("step '{step}' panicked: {message}")]
  StepPanicked { step: String, message: String },
}

impl RunError {
  /// Names of every step behind this error, depth first.
  pub fn failed_steps(&self) -> Vec<&str> {
    match self {
      RunError::MissingDependency { step, .. }
      | RunError::StepFailure { step, .. }
      | RunError::StepPanicked { step, .. } => vec![step.as_str()],
      RunError::Aggregate(aggregate) => aggregate
        .failures
        .iter()
        .flat_map(|f| f.error.failed_steps())
        .collect(),
      RunError::Cancelled | RunError::SeedCollision { .. } => Vec::new(),
    }
  }
}

/// Every branch failure from one parallel join, in branch declaration order.
#[derive(Debug, thiserror::Error)]
#[error("parallel '{parallel}' failed: {}", summarize(.failures))]
pub struct AggregateError {
  pub parallel: String,
  pub failures: Vec<BranchFailure>,
}

impl AggregateError {
  /// Names of the failed branches in declaration order.
  pub fn branches(&self) -> Vec<&str> {
    self.failures.iter().map(|f| f.branch.as_str()).collect()
  }
}

/// One failed branch of a parallel group.
#[derive(Debug)]
pub struct BranchFailure {
  /// Position of the branch among its siblings.
  pub index: usize,
  pub branch: String,
  pub error: RunError,
}

fn summarize(failures: &[BranchFailure]) -> String {
  failures
    .iter()
    .map(|f| format!("[{}] {}: {}", f.index, f.branch, f.error))
    .collect::<Vec<_>>()
    .join("; ")
}
