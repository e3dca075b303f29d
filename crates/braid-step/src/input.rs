//! The read snapshot handed to a step.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::StepError;

/// Everything a step may read while it runs.
///
/// Only the keys the step declared (dependencies first, then
/// back-references, each in declaration order) are visible. The snapshot is
/// immutable; the step's result is returned, never written here.
#[derive(Debug, Clone)]
pub struct StepInput {
  step: String,
  output_key: String,
  values: Vec<(String, Arc<serde_json::Value>)>,
  params: serde_json::Value,
  cancel: CancellationToken,
}

impl StepInput {
  pub fn new(
    step: impl Into<String>,
    output_key: impl Into<String>,
    params: serde_json::Value,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      step: step.into(),
      output_key: output_key.into(),
      values: Vec::new(),
      params,
      cancel,
    }
  }

  /// Add a readable value. A key added twice keeps its first value.
  pub fn with_value(mut self, key: impl Into<String>, value: Arc<serde_json::Value>) -> Self {
    let key = key.into();
    if !self.values.iter().any(|(k, _)| *k == key) {
      self.values.push((key, value));
    }
    self
  }

  /// Name of the step being executed.
  pub fn step(&self) -> &str {
    &self.step
  }

  /// Key the step's result will be published under.
  pub fn output_key(&self) -> &str {
    &self.output_key
  }

  pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
    self
      .values
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_ref())
  }

  /// Like [`StepInput::get`], but a missing key is an input error.
  pub fn require(&self, key: &str) -> Result<&serde_json::Value, StepError> {
    self
      .get(key)
      .ok_or_else(|| StepError::invalid_input(key, "key not visible to this step"))
  }

  /// Visible entries in declaration order.
  pub fn entries(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Opaque parameters from the step's descriptor.
  pub fn params(&self) -> &serde_json::Value {
    &self.params
  }

  /// Token a long-running step should watch to stop early.
  pub fn cancellation(&self) -> &CancellationToken {
    &self.cancel
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_visible_keys_only() {
    let input = StepInput::new("label", "label", json!(null), CancellationToken::new())
      .with_value("doubled", Arc::new(json!({ "invoice": 84 })))
      .with_value("raw", Arc::new(json!({ "invoice": 42 })));

    assert_eq!(input.step(), "label");
    assert_eq!(input.len(), 2);
    assert_eq!(input.require("doubled").unwrap()["invoice"], 84);
    assert!(input.get("other").is_none());
    assert!(matches!(
      input.require("other"),
      Err(StepError::InvalidInput { ref key, .. }) if key == "other"
    ));

    let keys: Vec<_> = input.entries().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["doubled", "raw"]);
  }

  #[test]
  fn test_duplicate_value_keeps_first() {
    let input = StepInput::new("s", "out", json!(null), CancellationToken::new())
      .with_value("raw", Arc::new(json!(1)))
      .with_value("raw", Arc::new(json!(2)));

    assert_eq!(input.len(), 1);
    assert_eq!(input.get("raw"), Some(&json!(1)));
  }
}
