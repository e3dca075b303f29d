use std::fmt;
use std::sync::Arc;

use braid_step::Step;

/// A leaf step together with its declared interface.
#[derive(Clone)]
pub struct StepNode {
  name: String,
  description: Option<String>,
  output_key: String,
  depends_on: Vec<String>,
  references: Vec<String>,
  params: serde_json::Value,
  step: Arc<dyn Step>,
}

impl StepNode {
  pub fn new(name: impl Into<String>, output_key: impl Into<String>, step: impl Step + 'static) -> Self {
    Self::from_shared(name, output_key, Arc::new(step))
  }

  /// Create a step node from an already shared step implementation.
  pub fn from_shared(
    name: impl Into<String>,
    output_key: impl Into<String>,
    step: Arc<dyn Step>,
  ) -> Self {
    Self {
      name: name.into(),
      description: None,
      output_key: output_key.into(),
      depends_on: Vec::new(),
      references: Vec::new(),
      params: serde_json::Value::Null,
      step,
    }
  }

  /// Keys that must be present in the linear context when the step runs.
  pub fn depends_on<I, K>(mut self, keys: I) -> Self
  where
    I: IntoIterator<Item = K>,
    K: Into<String>,
  {
    self.depends_on.extend(keys.into_iter().map(Into::into));
    self
  }

  /// Keys written earlier anywhere in the run that this step reads by name.
  pub fn references<I, K>(mut self, keys: I) -> Self
  where
    I: IntoIterator<Item = K>,
    K: Into<String>,
  {
    self.references.extend(keys.into_iter().map(Into::into));
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn with_params(mut self, params: serde_json::Value) -> Self {
    self.params = params;
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn description(&self) -> Option<&str> {
    self.description.as_deref()
  }

  pub fn output_key(&self) -> &str {
    &self.output_key
  }

  pub fn dependencies(&self) -> &[String] {
    &self.depends_on
  }

  pub fn back_references(&self) -> &[String] {
    &self.references
  }

  pub fn params(&self) -> &serde_json::Value {
    &self.params
  }

  pub fn step(&self) -> &Arc<dyn Step> {
    &self.step
  }
}

impl fmt::Debug for StepNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StepNode")
      .field("name", &self.name)
      .field("output_key", &self.output_key)
      .field("depends_on", &self.depends_on)
      .field("references", &self.references)
      .finish_non_exhaustive()
  }
}

/// A node in the composition tree.
#[derive(Debug, Clone)]
pub enum Node {
  Step(StepNode),
  /// Children run one after another, each seeing its predecessors' writes.
  Sequential {
    name: String,
    description: Option<String>,
    children: Vec<Arc<Node>>,
  },
  /// Branches run concurrently against the same forked context.
  Parallel {
    name: String,
    description: Option<String>,
    branches: Vec<Arc<Node>>,
  },
}

impl Node {
  pub fn step(step: StepNode) -> Self {
    Node::Step(step)
  }

  pub fn sequential(name: impl Into<String>, children: Vec<Node>) -> Self {
    Node::Sequential {
      name: name.into(),
      description: None,
      children: children.into_iter().map(Arc::new).collect(),
    }
  }

  pub fn parallel(name: impl Into<String>, branches: Vec<Node>) -> Self {
    Node::Parallel {
      name: name.into(),
      description: None,
      branches: branches.into_iter().map(Arc::new).collect(),
    }
  }

  pub fn with_description(mut self, text: impl Into<String>) -> Self {
    match &mut self {
      Node::Step(step) => step.description = Some(text.into()),
      Node::Sequential { description, .. } | Node::Parallel { description, .. } => {
        *description = Some(text.into())
      }
    }
    self
  }

  pub fn name(&self) -> &str {
    match self {
      Node::Step(step) => &step.name,
      Node::Sequential { name, .. } | Node::Parallel { name, .. } => name,
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Node::Step(_) => "step",
      Node::Sequential { .. } => "sequential",
      Node::Parallel { .. } => "parallel",
    }
  }

  /// Leaf steps in declaration order.
  pub fn steps(&self) -> Vec<&StepNode> {
    let mut out = Vec::new();
    self.collect_steps(&mut out);
    out
  }

  fn collect_steps<'a>(&'a self, out: &mut Vec<&'a StepNode>) {
    match self {
      Node::Step(step) => out.push(step),
      Node::Sequential { children, .. } => children.iter().for_each(|c| c.collect_steps(out)),
      Node::Parallel { branches, .. } => branches.iter().for_each(|b| b.collect_steps(out)),
    }
  }

  /// Output keys written by this subtree, in declaration order.
  pub fn output_keys(&self) -> Vec<&str> {
    self.steps().into_iter().map(|s| s.output_key()).collect()
  }
}

impl From<StepNode> for Node {
  fn from(step: StepNode) -> Self {
    Node::Step(step)
  }
}
