use async_trait::async_trait;
use braid_config::StepDef;
use braid_step::{Step, StepError, StepInput};

/// Always returns the same value.
#[derive(Debug, Clone)]
pub struct Constant {
  value: serde_json::Value,
}

impl Constant {
  pub fn new(value: serde_json::Value) -> Self {
    Self { value }
  }

  /// Build from a definition carrying `params.value`.
  pub fn from_def(def: &StepDef) -> Result<Self, String> {
    def
      .params
      .get("value")
      .cloned()
      .map(Self::new)
      .ok_or_else(|| "'constant' requires params.value".to_string())
  }
}

#[async_trait]
impl Step for Constant {
  async fn execute(&self, _input: &StepInput) -> Result<serde_json::Value, StepError> {
    Ok(self.value.clone())
  }
}
