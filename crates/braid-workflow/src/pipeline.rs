use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::WorkflowError;
use crate::node::Node;

/// A validated, immutable step tree.
///
/// Cloning is cheap; all clones share the same tree.
#[derive(Debug, Clone)]
pub struct Pipeline {
  inner: Arc<PipelineInner>,
}

#[derive(Debug)]
struct PipelineInner {
  name: String,
  input_keys: Vec<String>,
  root: Arc<Node>,
  output_keys: Vec<String>,
}

impl Pipeline {
  pub fn builder(name: impl Into<String>, root: Node) -> PipelineBuilder {
    PipelineBuilder::new(name, root)
  }

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  /// Keys the run is expected to be seeded with.
  pub fn input_keys(&self) -> &[String] {
    &self.inner.input_keys
  }

  pub fn root(&self) -> &Arc<Node> {
    &self.inner.root
  }

  /// Every key the tree writes, in declaration order.
  pub fn output_keys(&self) -> &[String] {
    &self.inner.output_keys
  }

  pub fn step_count(&self) -> usize {
    self.inner.output_keys.len()
  }
}

/// Assembles and validates a [`Pipeline`].
pub struct PipelineBuilder {
  name: String,
  root: Node,
  input_keys: Vec<String>,
}

impl PipelineBuilder {
  pub fn new(name: impl Into<String>, root: Node) -> Self {
    Self {
      name: name.into(),
      root,
      input_keys: Vec::new(),
    }
  }

  /// Declare a key the run will be seeded with. Repeats are ignored.
  pub fn input_key(mut self, key: impl Into<String>) -> Self {
    let key = key.into();
    if !self.input_keys.contains(&key) {
      self.input_keys.push(key);
    }
    self
  }

  /// Validate the tree and freeze it.
  pub fn build(self) -> Result<Pipeline, WorkflowError> {
    let mut validator = Validator::new(&self.input_keys);
    validator.visit(&self.root)?;
    let output_order = validator.output_order;

    Ok(Pipeline {
      inner: Arc::new(PipelineInner {
        name: self.name,
        input_keys: self.input_keys,
        output_keys: output_order,
        root: Arc::new(self.root),
      }),
    })
  }
}

/// Single-pass structural checks over the tree.
///
/// Every key written anywhere in a tree is visible to some later step on a
/// shared path (sequential successors, or everything after a parallel join),
/// so output keys must be unique tree-wide.
struct Validator<'a> {
  input_keys: HashSet<&'a str>,
  names: HashSet<String>,
  owners: HashMap<String, String>,
  output_order: Vec<String>,
}

impl<'a> Validator<'a> {
  fn new(input_keys: &'a [String]) -> Self {
    Self {
      input_keys: input_keys.iter().map(|k| k.as_str()).collect(),
      names: HashSet::new(),
      owners: HashMap::new(),
      output_order: Vec::new(),
    }
  }

  fn visit(&mut self, node: &Node) -> Result<(), WorkflowError> {
    let name = node.name();
    if name.trim().is_empty() {
      return Err(WorkflowError::InvalidNode {
        node: name.to_string(),
        message: format!("{} node has an empty name", node.kind()),
      });
    }
    if !self.names.insert(name.to_string()) {
      return Err(WorkflowError::DuplicateName {
        name: name.to_string(),
      });
    }

    match node {
      Node::Step(step) => {
        let key = step.output_key();
        if key.trim().is_empty() {
          return Err(WorkflowError::InvalidNode {
            node: name.to_string(),
            message: "output key is empty".to_string(),
          });
        }
        if step
          .dependencies()
          .iter()
          .chain(step.back_references())
          .any(|k| k == key)
        {
          return Err(WorkflowError::InvalidNode {
            node: name.to_string(),
            message: format!("step depends on its own output key '{}'", key),
          });
        }
        if self.input_keys.contains(key) {
          return Err(WorkflowError::InputKeyCollision {
            key: key.to_string(),
            step: name.to_string(),
          });
        }
        if let Some(first) = self.owners.get(key) {
          return Err(WorkflowError::KeyCollision {
            key: key.to_string(),
            first: first.clone(),
            second: name.to_string(),
          });
        }
        self.owners.insert(key.to_string(), name.to_string());
        self.output_order.push(key.to_string());
      }
      Node::Sequential { children, .. } => {
        for child in children {
          self.visit(child)?;
        }
      }
      Node::Parallel { branches, .. } => {
        for branch in branches {
          self.visit(branch)?;
        }
      }
    }

    Ok(())
  }
}
