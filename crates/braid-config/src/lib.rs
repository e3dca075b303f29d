//! Braid Config
//!
//! This crate contains the serializable pipeline configuration types for braid.
//! These types describe a step tree before it is resolved against a step
//! registry and validated into a runnable pipeline.
//!
//! Configuration can be loaded from:
//! - JSON files (via the CLI, `braid run pipeline.json`)
//! - Any other serde source (as embedded JSON blobs)
//!
//! The resolver binds each step's `uses` name to a step implementation,
//! checks the tree for key collisions, and produces a `Pipeline`.

mod enums;
mod node;
mod pipeline;
mod retry;

pub use enums::RetryBackoff;
pub use node::{NodeDef, StepDef};
pub use pipeline::PipelineDef;
pub use retry::RetryDef;
