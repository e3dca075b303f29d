use serde::{Deserialize, Serialize};

use crate::retry::RetryDef;

/// A leaf step in a pipeline definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Registry name of the step implementation (e.g. "passthrough").
  pub uses: String,
  pub output_key: String,
  /// Keys that must be present in the linear context when the step runs.
  #[serde(default)]
  pub depends_on: Vec<String>,
  /// Keys written anywhere earlier in the run that the step reads by name.
  #[serde(default)]
  pub references: Vec<String>,
  /// Opaque step parameters, passed through untouched.
  #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
  pub params: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub retry: Option<RetryDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDef {
  Step(StepDef),
  Sequential {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    children: Vec<NodeDef>,
  },
  Parallel {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    branches: Vec<NodeDef>,
  },
}

impl NodeDef {
  pub fn name(&self) -> &str {
    match self {
      NodeDef::Step(step) => &step.name,
      NodeDef::Sequential { name, .. } | NodeDef::Parallel { name, .. } => name,
    }
  }
}
