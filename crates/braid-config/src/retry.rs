use serde::{Deserialize, Serialize};

use crate::enums::RetryBackoff;

/// Retry section of a step definition.
///
/// `max_attempts` counts the first invocation, so `1` means no retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryDef {
  pub max_attempts: u32,
  #[serde(default)]
  pub backoff: RetryBackoff,
  #[serde(default = "default_delay_ms")]
  pub delay_ms: u64,
}

fn default_delay_ms() -> u64 {
  100
}
