//! Bounded retry decorator.
//!
//! Retries live outside the orchestrator: a retried step is just another
//! [`Step`], and the core never learns how many attempts it took.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::StepError;
use crate::input::StepInput;
use crate::step::Step;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backoff {
  #[default]
  Constant,
  Linear,
  Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts including the first. Zero is treated as one.
  pub max_attempts: u32,
  pub backoff: Backoff,
  pub delay: Duration,
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, backoff: Backoff, delay: Duration) -> Self {
    Self {
      max_attempts,
      backoff,
      delay,
    }
  }

  /// Delay before retry number `retry` (1-based).
  pub fn delay_for(&self, retry: u32) -> Duration {
    match self.backoff {
      Backoff::Constant => self.delay,
      Backoff::Linear => self.delay.saturating_mul(retry),
      Backoff::Exponential => {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.delay.saturating_mul(factor)
      }
    }
  }
}

/// Re-invokes the inner step on failure, up to the policy's attempt limit.
///
/// `StepError::Cancelled` is returned immediately, and cancellation during a
/// backoff sleep ends the retry loop.
pub struct Retry<S> {
  inner: S,
  policy: RetryPolicy,
}

impl<S: Step> Retry<S> {
  pub fn new(inner: S, policy: RetryPolicy) -> Self {
    Self { inner, policy }
  }

  pub fn policy(&self) -> &RetryPolicy {
    &self.policy
  }
}

#[async_trait]
impl<S: Step> Step for Retry<S> {
  async fn execute(&self, input: &StepInput) -> Result<serde_json::Value, StepError> {
    let max_attempts = self.policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
      match self.inner.execute(input).await {
        Ok(value) => return Ok(value),
        Err(StepError::Cancelled) => return Err(StepError::Cancelled),
        Err(e) if attempt < max_attempts => {
          let delay = self.policy.delay_for(attempt);
          warn!(
            step = %input.step(),
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "retrying step"
          );

          tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = input.cancellation().cancelled() => return Err(StepError::Cancelled),
          }
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicU32, Ordering};

  use serde_json::json;
  use tokio_util::sync::CancellationToken;

  use crate::step::step_fn;

  fn flaky(failures: u32, calls: Arc<AtomicU32>) -> impl Step {
    step_fn(move |_| {
      let calls = calls.clone();
      async move {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= failures {
          Err(StepError::failed(format!("attempt {} failed", n)))
        } else {
          Ok(json!(n))
        }
      }
    })
  }

  fn input() -> StepInput {
    StepInput::new("flaky", "out", json!(null), CancellationToken::new())
  }

  #[test]
  fn test_backoff_delays() {
    let base = Duration::from_millis(10);
    let constant = RetryPolicy::new(5, Backoff::Constant, base);
    let linear = RetryPolicy::new(5, Backoff::Linear, base);
    let exponential = RetryPolicy::new(5, Backoff::Exponential, base);

    assert_eq!(constant.delay_for(3), Duration::from_millis(10));
    assert_eq!(linear.delay_for(3), Duration::from_millis(30));
    assert_eq!(exponential.delay_for(1), Duration::from_millis(10));
    assert_eq!(exponential.delay_for(4), Duration::from_millis(80));
  }

  #[tokio::test(start_paused = true)]
  async fn test_succeeds_after_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = Retry::new(
      flaky(2, calls.clone()),
      RetryPolicy::new(3, Backoff::Linear, Duration::from_millis(5)),
    );

    let value = step.execute(&input()).await.unwrap();
    assert_eq!(value, json!(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_gives_up_after_max_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = Retry::new(
      flaky(10, calls.clone()),
      RetryPolicy::new(2, Backoff::Constant, Duration::from_millis(5)),
    );

    let err = step.execute(&input()).await.unwrap_err();
    assert_eq!(err.to_string(), "attempt 2 failed");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_cancelled_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let step = Retry::new(
      step_fn(move |_| {
        let counter = counter.clone();
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          Err(StepError::Cancelled)
        }
      }),
      RetryPolicy::new(5, Backoff::Constant, Duration::from_millis(1)),
    );

    assert!(matches!(
      step.execute(&input()).await,
      Err(StepError::Cancelled)
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_cancel_during_backoff() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = Retry::new(
      flaky(10, calls.clone()),
      RetryPolicy::new(5, Backoff::Constant, Duration::from_secs(60)),
    );

    let input = input();
    input.cancellation().cancel();

    assert!(matches!(
      step.execute(&input).await,
      Err(StepError::Cancelled)
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
