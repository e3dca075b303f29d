//! Execution events and notifiers for observability.
//!
//! Events are emitted while a pipeline runs so consumers can observe
//! progress, persist state, or stream it to a UI.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// A run has started.
  RunStarted {
    execution_id: String,
    pipeline: String,
  },

  /// A step acquired a worker permit and started executing.
  StepStarted { execution_id: String, step: String },

  /// A step returned a value, now published under its output key.
  StepCompleted {
    execution_id: String,
    step: String,
    output_key: String,
    elapsed_ms: u64,
  },

  /// A step failed, either before or during execution.
  StepFailed {
    execution_id: String,
    step: String,
    error: String,
  },

  /// A parallel group forked its branches.
  ParallelStarted {
    execution_id: String,
    parallel: String,
    branches: usize,
  },

  /// Every branch of a parallel group finished.
  ParallelJoined {
    execution_id: String,
    parallel: String,
    failed: usize,
  },

  /// The run completed successfully.
  RunCompleted {
    execution_id: String,
    elapsed_ms: u64,
  },

  /// The run failed.
  RunFailed { execution_id: String, error: String },

  /// The run was cancelled by its caller.
  RunCancelled { execution_id: String },
}

/// Trait for receiving execution events.
///
/// The orchestrator calls `notify` for each event; implementations decide
/// what to do with them. `notify` may be called from several worker tasks
/// at once.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a step. Volume is a handful
  // of events per step.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_channel_notifier_forwards() {
    let (notifier, mut receiver) = ChannelNotifier::channel();
    notifier.notify(ExecutionEvent::RunCancelled {
      execution_id: "e1".to_string(),
    });

    assert_eq!(
      receiver.try_recv().unwrap(),
      ExecutionEvent::RunCancelled {
        execution_id: "e1".to_string()
      }
    );
  }

  #[test]
  fn test_channel_notifier_ignores_closed_receiver() {
    let (notifier, receiver) = ChannelNotifier::channel();
    drop(receiver);
    notifier.notify(ExecutionEvent::RunStarted {
      execution_id: "e1".to_string(),
      pipeline: "p".to_string(),
    });
  }

  #[test]
  fn test_event_serializes() {
    let event = ExecutionEvent::StepCompleted {
      execution_id: "e1".to_string(),
      step: "DoubleStep".to_string(),
      output_key: "doubled".to_string(),
      elapsed_ms: 3,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["StepCompleted"]["output_key"], "doubled");
  }
}
