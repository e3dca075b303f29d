//! Recursive tree evaluation.
//!
//! Suspension points are exactly: waiting for a worker permit, waiting for a
//! step's work, and waiting for a parallel group's all-branches barrier.
//! Permits are held only while a leaf step executes, never across a
//! barrier, so nested parallel groups cannot starve the pool.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use braid_step::{Context, StepError, StepInput};
use braid_workflow::{Node, StepNode};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::{AggregateError, BranchFailure, RunError};
use crate::events::{ExecutionEvent, ExecutionNotifier};

/// Per-run state shared by every task of the run.
#[derive(Clone)]
pub(crate) struct RunScope {
  pub(crate) execution_id: Arc<str>,
  pub(crate) permits: Arc<Semaphore>,
  pub(crate) notifier: Arc<dyn ExecutionNotifier>,
  pub(crate) cancel: CancellationToken,
}

/// Evaluate a node against `context`, returning the context extended with
/// every key the node wrote.
pub(crate) fn evaluate(
  scope: RunScope,
  node: Arc<Node>,
  context: Context,
) -> BoxFuture<'static, Result<Context, RunError>> {
  Box::pin(async move {
    match node.as_ref() {
      Node::Step(step) => execute_step(&scope, step, context).await,
      Node::Sequential { name, children, .. } => {
        evaluate_sequential(&scope, name, children, context).await
      }
      Node::Parallel { name, branches, .. } => {
        evaluate_parallel(&scope, name, branches, context).await
      }
    }
  })
}

async fn evaluate_sequential(
  scope: &RunScope,
  name: &str,
  children: &[Arc<Node>],
  mut context: Context,
) -> Result<Context, RunError> {
  debug!(
    execution_id = %scope.execution_id,
    sequential = %name,
    children = children.len(),
    "sequential_started"
  );

  for child in children {
    context = evaluate(scope.clone(), child.clone(), context).await?;
  }

  Ok(context)
}

async fn evaluate_parallel(
  scope: &RunScope,
  name: &str,
  branches: &[Arc<Node>],
  context: Context,
) -> Result<Context, RunError> {
  if scope.cancel.is_cancelled() {
    return Err(RunError::Cancelled);
  }

  info!(
    execution_id = %scope.execution_id,
    parallel = %name,
    branches = branches.len(),
    "parallel_started"
  );
  scope.notifier.notify(ExecutionEvent::ParallelStarted {
    execution_id: scope.execution_id.to_string(),
    parallel: name.to_string(),
    branches: branches.len(),
  });

  let fork_len = context.len();

  // Dropping the set aborts every branch still running, so a run that is
  // dropped or cancelled never leaves detached branch tasks behind.
  let mut set = JoinSet::new();
  for (index, branch) in branches.iter().enumerate() {
    let span = info_span!("branch", parallel = %name, branch = %branch.name());
    let branch_run = evaluate(scope.clone(), branch.clone(), context.clone());
    set.spawn(async move { (index, branch_run.await) }.instrument(span));
  }

  // All-complete barrier: a failed branch never cuts its siblings short.
  let mut results: Vec<Option<Result<Context, RunError>>> =
    branches.iter().map(|_| None).collect();
  loop {
    tokio::select! {
      joined = set.join_next() => match joined {
        Some(Ok((index, result))) => results[index] = Some(result),
        Some(Err(e)) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Some(Err(_)) => return Err(RunError::Cancelled),
        None => break,
      },
      _ = scope.cancel.cancelled() => {
        warn!(execution_id = %scope.execution_id, parallel = %name, "parallel cancelled");
        return Err(RunError::Cancelled);
      }
    }
  }

  if scope.cancel.is_cancelled() {
    return Err(RunError::Cancelled);
  }

  let mut deltas = Vec::with_capacity(branches.len());
  let mut failures = Vec::new();
  for (index, (branch, result)) in branches.iter().zip(results).enumerate() {
    match result {
      Some(Ok(branch_context)) => deltas.push(branch_context),
      Some(Err(error)) => failures.push(BranchFailure {
        index,
        branch: branch.name().to_string(),
        error,
      }),
      None => return Err(RunError::Cancelled),
    }
  }

  info!(
    execution_id = %scope.execution_id,
    parallel = %name,
    failed = failures.len(),
    "parallel_joined"
  );
  scope.notifier.notify(ExecutionEvent::ParallelJoined {
    execution_id: scope.execution_id.to_string(),
    parallel: name.to_string(),
    failed: failures.len(),
  });

  if !failures.is_empty() {
    return Err(RunError::Aggregate(AggregateError {
      parallel: name.to_string(),
      failures,
    }));
  }

  // Single-threaded merge, in branch declaration order.
  let mut merged = context;
  for delta in &deltas {
    for (key, value) in delta.entries_since(fork_len) {
      merged
        .insert_shared(key, value.clone())
        .map_err(|_| RunError::SeedCollision {
          key: key.to_string(),
        })?;
    }
  }

  Ok(merged)
}

async fn execute_step(
  scope: &RunScope,
  node: &StepNode,
  mut context: Context,
) -> Result<Context, RunError> {
  if scope.cancel.is_cancelled() {
    return Err(RunError::Cancelled);
  }

  let input = match resolve_input(node, &context, scope.cancel.child_token()) {
    Ok(input) => input,
    Err(e) => {
      step_failed(scope, node, &e);
      return Err(e);
    }
  };

  let permit = tokio::select! {
    permit = scope.permits.clone().acquire_owned() => {
      permit.map_err(|_| RunError::Cancelled)?
    }
    _ = scope.cancel.cancelled() => return Err(RunError::Cancelled),
  };

  info!(
    execution_id = %scope.execution_id,
    step = %node.name(),
    output_key = %node.output_key(),
    "step_started"
  );
  scope.notifier.notify(ExecutionEvent::StepStarted {
    execution_id: scope.execution_id.to_string(),
    step: node.name().to_string(),
  });

  let started = Instant::now();
  let result = tokio::select! {
    result = AssertUnwindSafe(node.step().execute(&input)).catch_unwind() => match result {
      Ok(result) => result,
      Err(payload) => {
        let e = RunError::StepPanicked {
          step: node.name().to_string(),
          message: panic_message(payload.as_ref()),
        };
        step_failed(scope, node, &e);
        return Err(e);
      }
    },
    _ = scope.cancel.cancelled() => {
      warn!(execution_id = %scope.execution_id, step = %node.name(), "step cancelled");
      return Err(RunError::Cancelled);
    }
  };
  drop(permit);

  let value = match result {
    Ok(value) => value,
    Err(StepError::Cancelled) if scope.cancel.is_cancelled() => return Err(RunError::Cancelled),
    Err(source) => {
      let e = RunError::StepFailure {
        step: node.name().to_string(),
        source,
      };
      step_failed(scope, node, &e);
      return Err(e);
    }
  };

  let elapsed_ms = started.elapsed().as_millis() as u64;
  info!(
    execution_id = %scope.execution_id,
    step = %node.name(),
    output_key = %node.output_key(),
    elapsed_ms,
    "step_completed"
  );

  context
    .insert(node.output_key(), value)
    .map_err(|_| RunError::SeedCollision {
      key: node.output_key().to_string(),
    })?;

  scope.notifier.notify(ExecutionEvent::StepCompleted {
    execution_id: scope.execution_id.to_string(),
    step: node.name().to_string(),
    output_key: node.output_key().to_string(),
    elapsed_ms,
  });

  Ok(context)
}

/// Build the step's snapshot from its declared keys.
///
/// Dependencies come from the linear context; back-references are looked up
/// by key across everything written so far in the run. Either kind missing
/// fails the step before it is dispatched.
fn resolve_input(
  node: &StepNode,
  context: &Context,
  cancel: CancellationToken,
) -> Result<StepInput, RunError> {
  let mut input = StepInput::new(
    node.name(),
    node.output_key(),
    node.params().clone(),
    cancel,
  );

  for key in node.dependencies().iter().chain(node.back_references()) {
    let value = context
      .get_shared(key)
      .ok_or_else(|| RunError::MissingDependency {
        step: node.name().to_string(),
        key: key.clone(),
      })?;
    input = input.with_value(key.clone(), value);
  }

  Ok(input)
}

fn step_failed(scope: &RunScope, node: &StepNode, e: &RunError) {
  error!(
    execution_id = %scope.execution_id,
    step = %node.name(),
    error = %e,
    "step_failed"
  );
  scope.notifier.notify(ExecutionEvent::StepFailed {
    execution_id: scope.execution_id.to_string(),
    step: node.name().to_string(),
    error: e.to_string(),
  });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "step panicked".to_string()
  }
}
