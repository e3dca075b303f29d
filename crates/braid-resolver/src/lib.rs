//! Braid Resolver
//!
//! Turns a declarative [`PipelineDef`](braid_config::PipelineDef) into a
//! validated [`Pipeline`](braid_workflow::Pipeline). Each step's `uses` name
//! is looked up in a caller-owned [`StepRegistry`]; there is no global
//! registry.

mod error;
mod registry;
mod resolver;

pub use error::ResolveError;
pub use registry::{StepFactory, StepRegistry};
pub use resolver::{Resolver, StandardResolver};
