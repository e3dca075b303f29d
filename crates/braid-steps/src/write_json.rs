use std::path::PathBuf;

use async_trait::async_trait;
use braid_config::StepDef;
use braid_step::{Step, StepError, StepInput};
use serde_json::json;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::single_value;

/// Writes one value to disk as pretty-printed JSON.
///
/// Parent directories are created automatically. An existing file is
/// replaced.
#[derive(Debug, Clone)]
pub struct WriteJson {
  path: PathBuf,
}

impl WriteJson {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Build from a definition carrying `params.path`.
  pub fn from_def(def: &StepDef) -> Result<Self, String> {
    def
      .params
      .get("path")
      .and_then(|p| p.as_str())
      .map(Self::new)
      .ok_or_else(|| "'write_json' requires a string params.path".to_string())
  }

  pub fn path(&self) -> &PathBuf {
    &self.path
  }
}

#[async_trait]
impl Step for WriteJson {
  async fn execute(&self, input: &StepInput) -> Result<serde_json::Value, StepError> {
    let value = single_value(input)?;
    let bytes = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).await?;
    }

    let mut file = File::create(&self.path).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;

    info!(
      step = %input.step(),
      path = %self.path.display(),
      bytes = bytes.len(),
      "wrote json output"
    );

    Ok(json!({
      "status": "written",
      "path": self.path.display().to_string(),
      "bytes": bytes.len(),
    }))
  }
}
