use std::sync::Arc;

use braid_config::StepDef;
use braid_resolver::StepRegistry;
use braid_step::Step;

use crate::{Collect, Constant, Passthrough, WriteJson, expect_single_key};

/// A registry holding every step in this crate.
pub fn builtin_registry() -> StepRegistry {
  let mut registry = StepRegistry::new();
  registry
    .register("passthrough", |def: &StepDef| {
      expect_single_key(def)?;
      Ok(Arc::new(Passthrough) as Arc<dyn Step>)
    })
    .register("collect", |_: &StepDef| {
      Ok(Arc::new(Collect) as Arc<dyn Step>)
    })
    .register("constant", |def: &StepDef| {
      Ok(Arc::new(Constant::from_def(def)?) as Arc<dyn Step>)
    })
    .register("write_json", |def: &StepDef| {
      expect_single_key(def)?;
      Ok(Arc::new(WriteJson::from_def(def)?) as Arc<dyn Step>)
    });
  registry
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builtin_kinds() {
    assert_eq!(
      builtin_registry().kinds(),
      vec!["collect", "constant", "passthrough", "write_json"]
    );
  }
}
