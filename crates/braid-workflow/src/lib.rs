//! Braid Workflow
//!
//! This crate provides the static composition tree for braid. A tree is
//! built once from named steps composed into sequential chains and parallel
//! fan-out groups, validated, and then reused for any number of runs.
//!
//! Key properties of a [`Pipeline`]:
//! - Every node name is unique (names are used for diagnostics)
//! - Every output key is written by exactly one step, and never by a step
//!   and the run's seed input at once
//! - The tree is immutable and cheap to clone, so spawned branch tasks can
//!   hold their own handle to it

mod error;
mod node;
mod pipeline;

pub use error::WorkflowError;
pub use node::{Node, StepNode};
pub use pipeline::{Pipeline, PipelineBuilder};
