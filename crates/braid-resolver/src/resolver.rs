use std::sync::Arc;
use std::time::Duration;

use braid_config::{NodeDef, PipelineDef, RetryBackoff, RetryDef, StepDef};
use braid_step::{Backoff, Retry, RetryPolicy, Step};
use braid_workflow::{Node, Pipeline, StepNode};
use tracing::debug;

use crate::error::ResolveError;
use crate::registry::StepRegistry;

/// Resolver transforms a PipelineDef into a runnable Pipeline.
pub trait Resolver: Send + Sync {
  /// Resolve a pipeline definition.
  ///
  /// This process:
  /// 1. Binds every step's `uses` name to an implementation
  /// 2. Wraps steps that declare a retry section
  /// 3. Validates the assembled tree (unique names, no key collisions)
  fn resolve(&self, def: &PipelineDef) -> Result<Pipeline, ResolveError>;
}

/// Standard resolver backed by a [`StepRegistry`].
#[derive(Debug, Clone)]
pub struct StandardResolver {
  registry: StepRegistry,
}

impl StandardResolver {
  pub fn new(registry: StepRegistry) -> Self {
    Self { registry }
  }

  pub fn registry(&self) -> &StepRegistry {
    &self.registry
  }

  fn resolve_node(&self, def: &NodeDef) -> Result<Node, ResolveError> {
    let (node, description) = match def {
      NodeDef::Step(step) => (Node::Step(self.resolve_step(step)?), &step.description),
      NodeDef::Sequential {
        name,
        description,
        children,
      } => {
        let children = children
          .iter()
          .map(|child| self.resolve_node(child))
          .collect::<Result<Vec<_>, _>>()?;
        (Node::sequential(name.clone(), children), description)
      }
      NodeDef::Parallel {
        name,
        description,
        branches,
      } => {
        let branches = branches
          .iter()
          .map(|branch| self.resolve_node(branch))
          .collect::<Result<Vec<_>, _>>()?;
        (Node::parallel(name.clone(), branches), description)
      }
    };

    Ok(match description {
      Some(text) => node.with_description(text.clone()),
      None => node,
    })
  }

  fn resolve_step(&self, def: &StepDef) -> Result<StepNode, ResolveError> {
    let factory = self
      .registry
      .get(&def.uses)
      .ok_or_else(|| ResolveError::UnknownStep {
        step: def.name.clone(),
        uses: def.uses.clone(),
      })?;

    let mut step = factory(def).map_err(|message| ResolveError::StepConstruction {
      step: def.name.clone(),
      message,
    })?;

    if let Some(retry) = &def.retry {
      debug!(step = %def.name, max_attempts = retry.max_attempts, "wrapping step in retry");
      step = Arc::new(Retry::new(step, retry_policy(retry))) as Arc<dyn Step>;
    }

    Ok(
      StepNode::from_shared(def.name.clone(), def.output_key.clone(), step)
        .depends_on(def.depends_on.iter().cloned())
        .references(def.references.iter().cloned())
        .with_params(def.params.clone()),
    )
  }
}

impl Resolver for StandardResolver {
  fn resolve(&self, def: &PipelineDef) -> Result<Pipeline, ResolveError> {
    let root = self.resolve_node(&def.root)?;
    let pipeline = Pipeline::builder(def.name.clone(), root)
      .input_key(def.input_key.clone())
      .build()?;

    debug!(
      pipeline = %pipeline.name(),
      steps = pipeline.step_count(),
      "pipeline resolved"
    );
    Ok(pipeline)
  }
}

fn retry_policy(def: &RetryDef) -> RetryPolicy {
  let backoff = match def.backoff {
    RetryBackoff::Constant => Backoff::Constant,
    RetryBackoff::Linear => Backoff::Linear,
    RetryBackoff::Exponential => Backoff::Exponential,
  };
  RetryPolicy::new(def.max_attempts, backoff, Duration::from_millis(def.delay_ms))
}
