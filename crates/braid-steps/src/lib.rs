//! Braid Steps
//!
//! General-purpose steps that are useful in almost any pipeline:
//!
//! | `uses`        | Step            | Result                                        |
//! |---------------|-----------------|-----------------------------------------------|
//! | `passthrough` | [`Passthrough`] | its single visible value, unchanged           |
//! | `collect`     | [`Collect`]     | an object of every visible value, keyed       |
//! | `constant`    | [`Constant`]    | `params.value`                                |
//! | `write_json`  | [`WriteJson`]   | writes its single visible value to `params.path` |
//!
//! [`builtin_registry`] returns a registry with all of them.

mod collect;
mod constant;
mod passthrough;
mod registry;
mod write_json;

pub use collect::Collect;
pub use constant::Constant;
pub use passthrough::Passthrough;
pub use registry::builtin_registry;
pub use write_json::WriteJson;

use braid_step::{StepError, StepInput};

/// The one value a single-input step reads.
fn single_value(input: &StepInput) -> Result<&serde_json::Value, StepError> {
  let mut entries = input.entries();
  match (entries.next(), entries.next()) {
    (Some((_, value)), None) => Ok(value),
    (None, _) => Err(StepError::failed(format!(
      "step '{}' has no input; declare one dependency or reference",
      input.step()
    ))),
    (Some(_), Some(_)) => Err(StepError::failed(format!(
      "step '{}' reads {} keys but accepts exactly one",
      input.step(),
      input.len()
    ))),
  }
}

/// Reject definitions that declare anything other than one input key.
fn expect_single_key(def: &braid_config::StepDef) -> Result<(), String> {
  match def.depends_on.len() + def.references.len() {
    1 => Ok(()),
    n => Err(format!(
      "'{}' expects exactly one dependency or reference, got {}",
      def.uses, n
    )),
  }
}
