use async_trait::async_trait;
use braid_step::{Step, StepError, StepInput};

use crate::single_value;

/// Republishes one value under a new key.
///
/// Typically the first step of a pipeline, storing the raw input under the
/// key later steps depend on.
#[derive(Debug, Clone, Default)]
pub struct Passthrough;

#[async_trait]
impl Step for Passthrough {
  async fn execute(&self, input: &StepInput) -> Result<serde_json::Value, StepError> {
    single_value(input).cloned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::Arc;
  use tokio_util::sync::CancellationToken;

  #[tokio::test]
  async fn test_returns_single_value() {
    let input = StepInput::new("store", "stored", json!(null), CancellationToken::new())
      .with_value("raw", Arc::new(json!({ "invoice": 42 })));

    let value = Passthrough.execute(&input).await.unwrap();
    assert_eq!(value, json!({ "invoice": 42 }));
  }

  #[tokio::test]
  async fn test_rejects_empty_input() {
    let input = StepInput::new("store", "stored", json!(null), CancellationToken::new());

    let err = Passthrough.execute(&input).await.unwrap_err();
    assert!(err.to_string().contains("has no input"));
  }
}
