use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use braid_config::StepDef;
use braid_step::Step;

/// Builds a step implementation from its definition.
pub type StepFactory = dyn Fn(&StepDef) -> Result<Arc<dyn Step>, String> + Send + Sync;

/// Maps `uses` names to step factories.
#[derive(Clone, Default)]
pub struct StepRegistry {
  factories: HashMap<String, Arc<StepFactory>>,
}

impl StepRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a factory, replacing any previous one with the same name.
  pub fn register<F>(&mut self, uses: impl Into<String>, factory: F) -> &mut Self
  where
    F: Fn(&StepDef) -> Result<Arc<dyn Step>, String> + Send + Sync + 'static,
  {
    self.factories.insert(uses.into(), Arc::new(factory));
    self
  }

  pub fn contains(&self, uses: &str) -> bool {
    self.factories.contains_key(uses)
  }

  /// Registered names, sorted.
  pub fn kinds(&self) -> Vec<&str> {
    let mut kinds: Vec<&str> = self.factories.keys().map(|k| k.as_str()).collect();
    kinds.sort_unstable();
    kinds
  }

  pub(crate) fn get(&self, uses: &str) -> Option<&Arc<StepFactory>> {
    self.factories.get(uses)
  }
}

impl fmt::Debug for StepRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StepRegistry")
      .field("kinds", &self.kinds())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use braid_step::{StepError, step_fn};

  fn noop(_: &StepDef) -> Result<Arc<dyn Step>, String> {
    Ok(Arc::new(step_fn(|_| async {
      Ok::<_, StepError>(serde_json::Value::Null)
    })))
  }

  #[test]
  fn test_register_and_lookup() {
    let mut registry = StepRegistry::new();
    registry.register("zeta", noop).register("alpha", noop);

    assert!(registry.contains("alpha"));
    assert!(!registry.contains("beta"));
    assert_eq!(registry.kinds(), vec!["alpha", "zeta"]);
    assert!(registry.get("zeta").is_some());
  }
}
