//! Orchestrator entrypoint.
//!
//! The [`Orchestrator`] owns the worker permit pool and the event notifier.
//! It is independent of any particular pipeline, so one orchestrator can run
//! many pipelines, and many runs of each, concurrently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use braid_step::Context;
use braid_workflow::Pipeline;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::RunError;
use crate::evaluate::{RunScope, evaluate};
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};

/// Seed key used by [`Orchestrator::run`] when a pipeline declares none.
pub const DEFAULT_INPUT_KEY: &str = "input";

/// Configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
  /// Maximum number of steps executing at the same time. Zero is treated
  /// as one.
  pub max_concurrency: usize,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      max_concurrency: std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4),
    }
  }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
  /// Unique execution ID.
  pub execution_id: String,
  /// The seed context plus every step's output.
  pub context: Context,
  pub elapsed: Duration,
}

/// Runs pipelines.
pub struct Orchestrator {
  config: RuntimeConfig,
  permits: Arc<Semaphore>,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl Orchestrator {
  pub fn new(config: RuntimeConfig) -> Self {
    let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
    Self {
      config,
      permits,
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Replace the event notifier.
  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }

  /// Run a pipeline with `input` stored under the pipeline's first input key
  /// (or [`DEFAULT_INPUT_KEY`] if it declares none).
  pub async fn run(
    &self,
    pipeline: &Pipeline,
    input: serde_json::Value,
    cancel: CancellationToken,
  ) -> Result<RunOutcome, RunError> {
    let key = pipeline
      .input_keys()
      .first()
      .map(|k| k.as_str())
      .unwrap_or(DEFAULT_INPUT_KEY);

    self
      .run_with_context(pipeline, Context::seeded(key, input), cancel)
      .await
  }

  /// Run a pipeline against an arbitrary seed context.
  ///
  /// All-or-nothing: on any failure no partial context is returned.
  #[instrument(
    name = "pipeline_run",
    skip(self, pipeline, context, cancel),
    fields(pipeline = %pipeline.name())
  )]
  pub async fn run_with_context(
    &self,
    pipeline: &Pipeline,
    context: Context,
    cancel: CancellationToken,
  ) -> Result<RunOutcome, RunError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let started = Instant::now();

    info!(
      execution_id = %execution_id,
      pipeline = %pipeline.name(),
      seed_keys = ?context.keys().collect::<Vec<_>>(),
      "run_started"
    );
    self.notifier.notify(ExecutionEvent::RunStarted {
      execution_id: execution_id.clone(),
      pipeline: pipeline.name().to_string(),
    });

    let result = match self.check_seed(pipeline, &context) {
      Ok(()) => {
        let scope = RunScope {
          execution_id: Arc::from(execution_id.as_str()),
          permits: self.permits.clone(),
          notifier: self.notifier.clone(),
          cancel: cancel.clone(),
        };
        evaluate(scope, pipeline.root().clone(), context).await
      }
      Err(e) => Err(e),
    };

    // Branch-level failures raced with a cancel are reported as the cancel.
    let result = match result {
      Err(_) if cancel.is_cancelled() => Err(RunError::Cancelled),
      other => other,
    };

    let elapsed = started.elapsed();
    match &result {
      Ok(context) => {
        info!(
          execution_id = %execution_id,
          keys = context.len(),
          elapsed_ms = elapsed.as_millis() as u64,
          "run_completed"
        );
        self.notifier.notify(ExecutionEvent::RunCompleted {
          execution_id: execution_id.clone(),
          elapsed_ms: elapsed.as_millis() as u64,
        });
      }
      Err(RunError::Cancelled) => {
        warn!(execution_id = %execution_id, "run_cancelled");
        self.notifier.notify(ExecutionEvent::RunCancelled {
          execution_id: execution_id.clone(),
        });
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "run_failed");
        self.notifier.notify(ExecutionEvent::RunFailed {
          execution_id: execution_id.clone(),
          error: e.to_string(),
        });
      }
    }

    result.map(|context| RunOutcome {
      execution_id,
      context,
      elapsed,
    })
  }

  /// Reject seed contexts that already hold a key the tree will write.
  fn check_seed(&self, pipeline: &Pipeline, context: &Context) -> Result<(), RunError> {
    match pipeline
      .output_keys()
      .iter()
      .find(|k| context.contains_key(k))
    {
      Some(key) => Err(RunError::SeedCollision { key: key.clone() }),
      None => Ok(()),
    }
  }
}

impl Default for Orchestrator {
  fn default() -> Self {
    Self::new(RuntimeConfig::default())
  }
}
