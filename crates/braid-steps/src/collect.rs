use async_trait::async_trait;
use braid_step::{Step, StepError, StepInput};

/// Gathers every visible value into one object, keyed by context key.
///
/// Used after a parallel group to consolidate the branch results.
#[derive(Debug, Clone, Default)]
pub struct Collect;

#[async_trait]
impl Step for Collect {
  async fn execute(&self, input: &StepInput) -> Result<serde_json::Value, StepError> {
    Ok(serde_json::Value::Object(
      input
        .entries()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect(),
    ))
  }
}
