//! Run-scoped key/value context.

use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ContextError;

/// Append-only mapping from output key to JSON value.
///
/// Values are stored behind `Arc`, so cloning a context to fork it for a
/// parallel branch copies only the key index, never the payloads. Keys keep
/// their insertion order; because nothing is ever removed or overwritten,
/// the keys written after a fork are exactly the suffix past the fork length.
#[derive(Debug, Clone, Default)]
pub struct Context {
  values: HashMap<String, Arc<serde_json::Value>>,
  order: Vec<String>,
}

impl Context {
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a context holding a single seed value.
  pub fn seeded(key: impl Into<String>, value: serde_json::Value) -> Self {
    let mut context = Self::new();
    let key = key.into();
    context.order.push(key.clone());
    context.values.insert(key, Arc::new(value));
    context
  }

  pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
    self.values.get(key).map(|v| v.as_ref())
  }

  /// Get the shared handle for a value without cloning the payload.
  pub fn get_shared(&self, key: &str) -> Option<Arc<serde_json::Value>> {
    self.values.get(key).cloned()
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  /// Keys in insertion order.
  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.order.iter().map(|k| k.as_str())
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// Add a new key. Fails if the key is already present.
  pub fn insert(
    &mut self,
    key: impl Into<String>,
    value: serde_json::Value,
  ) -> Result<(), ContextError> {
    self.insert_shared(key, Arc::new(value))
  }

  /// Add a new key from an already shared value.
  pub fn insert_shared(
    &mut self,
    key: impl Into<String>,
    value: Arc<serde_json::Value>,
  ) -> Result<(), ContextError> {
    let key = key.into();
    if self.values.contains_key(&key) {
      return Err(ContextError::DuplicateKey { key });
    }
    self.order.push(key.clone());
    self.values.insert(key, value);
    Ok(())
  }

  /// Entries in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
    self
      .order
      .iter()
      .filter_map(|k| self.values.get(k).map(|v| (k.as_str(), v.as_ref())))
  }

  /// Entries appended after the context had `len` keys.
  ///
  /// Used to extract a branch's delta relative to the context it forked from.
  pub fn entries_since(&self, len: usize) -> impl Iterator<Item = (&str, &Arc<serde_json::Value>)> {
    self
      .order
      .iter()
      .skip(len)
      .filter_map(|k| self.values.get(k).map(|v| (k.as_str(), v)))
  }

  /// Render the context as a JSON object.
  pub fn to_json(&self) -> serde_json::Value {
    serde_json::Value::Object(
      self
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect(),
    )
  }
}

impl PartialEq for Context {
  fn eq(&self, other: &Self) -> bool {
    self.values.len() == other.values.len()
      && self
        .values
        .iter()
        .all(|(k, v)| other.values.get(k).is_some_and(|o| o == v))
  }
}

impl From<serde_json::Map<String, serde_json::Value>> for Context {
  fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
    let mut context = Self::new();
    for (key, value) in map {
      context.order.push(key.clone());
      context.values.insert(key, Arc::new(value));
    }
    context
  }
}

impl Serialize for Context {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.order.len()))?;
    for (key, value) in self.iter() {
      map.serialize_entry(key, value)?;
    }
    map.end()
  }
}
