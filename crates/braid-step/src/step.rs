//! The step trait and a closure adapter.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StepError;
use crate::input::StepInput;

/// A unit of work that turns a context snapshot into one keyed result.
///
/// Steps must be safe to call concurrently with unrelated steps and must not
/// assume they run on any particular thread.
#[async_trait]
pub trait Step: Send + Sync {
  async fn execute(&self, input: &StepInput) -> Result<serde_json::Value, StepError>;
}

#[async_trait]
impl<S: Step + ?Sized> Step for Arc<S> {
  async fn execute(&self, input: &StepInput) -> Result<serde_json::Value, StepError> {
    (**self).execute(input).await
  }
}

#[async_trait]
impl<S: Step + ?Sized> Step for Box<S> {
  async fn execute(&self, input: &StepInput) -> Result<serde_json::Value, StepError> {
    (**self).execute(input).await
  }
}

/// A step backed by an async closure.
///
/// The closure receives an owned copy of the snapshot; copies are cheap
/// because values are shared.
pub struct FnStep<F> {
  f: F,
}

/// Wrap an async closure as a [`Step`].
pub fn step_fn<F, Fut>(f: F) -> FnStep<F>
where
  F: Fn(StepInput) -> Fut + Send + Sync,
  Fut: Future<Output = Result<serde_json::Value, StepError>> + Send,
{
  FnStep { f }
}

#[async_trait]
impl<F, Fut> Step for FnStep<F>
where
  F: Fn(StepInput) -> Fut + Send + Sync,
  Fut: Future<Output = Result<serde_json::Value, StepError>> + Send,
{
  async fn execute(&self, input: &StepInput) -> Result<serde_json::Value, StepError> {
    (self.f)(input.clone()).await
  }
}
