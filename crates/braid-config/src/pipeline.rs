use serde::{Deserialize, Serialize};

use crate::node::NodeDef;

/// A complete pipeline definition as loaded from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDef {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Context key the external input payload is stored under.
  #[serde(default = "default_input_key")]
  pub input_key: String,
  pub root: NodeDef,
}

fn default_input_key() -> String {
  "raw_data".to_string()
}
