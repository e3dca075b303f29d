//! Pipeline runner with channel-based triggering.
//!
//! The `PipelineRunner` owns an mpsc channel for receiving input payloads
//! and runs one pipeline against each of them using an [`Orchestrator`].

use std::sync::Arc;

use braid_workflow::Pipeline;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::RunError;
use crate::runtime::{Orchestrator, RunOutcome};

/// A runner that executes a pipeline in response to input payloads.
///
/// # Usage
///
/// ```ignore
/// let runner = PipelineRunner::new(orchestrator, pipeline);
///
/// // Get sender for external producers
/// let sender = runner.sender();
///
/// // Start the execution loop
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await;
/// ```
pub struct PipelineRunner {
  sender: mpsc::Sender<serde_json::Value>,
  receiver: mpsc::Receiver<serde_json::Value>,
  orchestrator: Arc<Orchestrator>,
  pipeline: Pipeline,
}

impl PipelineRunner {
  pub fn new(orchestrator: Arc<Orchestrator>, pipeline: Pipeline) -> Self {
    Self::with_buffer_size(orchestrator, pipeline, 100)
  }

  /// Create a new runner with a custom buffer size.
  pub fn with_buffer_size(
    orchestrator: Arc<Orchestrator>,
    pipeline: Pipeline,
    buffer_size: usize,
  ) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      orchestrator,
      pipeline,
    }
  }

  /// Get a sender handle for submitting payloads.
  pub fn sender(&self) -> mpsc::Sender<serde_json::Value> {
    self.sender.clone()
  }

  /// Submit a payload through the runner's own channel.
  pub async fn run(
    &self,
    payload: serde_json::Value,
  ) -> Result<(), mpsc::error::SendError<serde_json::Value>> {
    self.sender.send(payload).await
  }

  /// Start the execution loop.
  ///
  /// Returns when the cancellation token fires or every sender is dropped.
  /// Payloads are processed one at a time; each run gets a child token.
  pub async fn start(mut self, cancel: CancellationToken) {
    // Only external senders keep the loop alive.
    drop(self.sender);
    info!(pipeline = %self.pipeline.name(), "starting pipeline runner");

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!(pipeline = %self.pipeline.name(), "pipeline runner cancelled");
          break;
        }
        payload = self.receiver.recv() => {
          let Some(payload) = payload else {
            info!(pipeline = %self.pipeline.name(), "pipeline runner channel closed");
            break;
          };

          match self
            .orchestrator
            .run(&self.pipeline, payload, cancel.child_token())
            .await
          {
            Ok(outcome) => info!(
              pipeline = %self.pipeline.name(),
              execution_id = %outcome.execution_id,
              keys = outcome.context.len(),
              "pipeline execution completed"
            ),
            Err(RunError::Cancelled) => {
              info!(pipeline = %self.pipeline.name(), "pipeline execution cancelled")
            }
            Err(e) => error!(
              pipeline = %self.pipeline.name(),
              error = %e,
              "pipeline execution failed"
            ),
          }
        }
      }
    }
  }

  /// Run the pipeline once, outside the loop.
  pub async fn execute_once(
    &self,
    payload: serde_json::Value,
    cancel: CancellationToken,
  ) -> Result<RunOutcome, RunError> {
    self.orchestrator.run(&self.pipeline, payload, cancel).await
  }

  pub fn pipeline(&self) -> &Pipeline {
    &self.pipeline
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::ChannelNotifier;
  use crate::events::ExecutionEvent;
  use crate::runtime::RuntimeConfig;
  use braid_step::{StepError, StepInput, step_fn};
  use braid_workflow::{Node, StepNode};
  use std::time::Duration;

  fn echo_pipeline() -> Pipeline {
    let echo = StepNode::new(
      "echo",
      "echoed",
      step_fn(|input: StepInput| async move {
        Ok::<_, StepError>(input.require("payload")?.clone())
      }),
    )
    .depends_on(["payload"]);

    Pipeline::builder("echo-pipeline", Node::sequential("main", vec![echo.into()]))
      .input_key("payload")
      .build()
      .unwrap()
  }

  fn create_runner() -> PipelineRunner {
    let orchestrator = Arc::new(Orchestrator::new(RuntimeConfig { max_concurrency: 2 }));
    PipelineRunner::new(orchestrator, echo_pipeline())
  }

  #[tokio::test]
  async fn test_runner_creation() {
    let runner = create_runner();
    assert_eq!(runner.pipeline().name(), "echo-pipeline");
  }

  #[tokio::test]
  async fn test_sender_cloning() {
    let runner = create_runner();

    let sender1 = runner.sender();
    let sender2 = runner.sender();

    assert!(!sender1.is_closed());
    assert!(!sender2.is_closed());
  }

  #[tokio::test]
  async fn test_run_sends_to_channel() {
    let mut runner = create_runner();

    runner.run(serde_json::json!({"test": "data"})).await.unwrap();

    let received = runner.receiver.recv().await;
    assert_eq!(received.unwrap()["test"], "data");
  }

  #[tokio::test]
  async fn test_execute_once() {
    let runner = create_runner();

    let outcome = runner
      .execute_once(serde_json::json!(7), CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(outcome.context.get("echoed"), Some(&serde_json::json!(7)));
  }

  #[tokio::test]
  async fn test_loop_runs_each_payload() {
    let (notifier, mut events) = ChannelNotifier::channel();
    let orchestrator = Arc::new(
      Orchestrator::new(RuntimeConfig { max_concurrency: 2 }).with_notifier(Arc::new(notifier)),
    );
    let runner = PipelineRunner::new(orchestrator, echo_pipeline());
    let sender = runner.sender();

    let handle = tokio::spawn(runner.start(CancellationToken::new()));
    sender.send(serde_json::json!(1)).await.unwrap();
    sender.send(serde_json::json!(2)).await.unwrap();
    drop(sender);

    // Loop exits once the last sender is gone
    handle.await.unwrap();

    let mut completed = 0;
    while let Ok(event) = events.try_recv() {
      if matches!(event, ExecutionEvent::RunCompleted { .. }) {
        completed += 1;
      }
    }
    assert_eq!(completed, 2);
  }

  #[tokio::test]
  async fn test_cancellation() {
    let runner = create_runner();
    let _sender = runner.sender();

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    let handle = tokio::spawn(async move { runner.start(cancel_clone).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    assert!(handle.await.is_ok());
  }
}
