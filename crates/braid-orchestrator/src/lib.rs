//! Braid Orchestrator
//!
//! This crate runs a validated [`Pipeline`](braid_workflow::Pipeline) against
//! a run-scoped [`Context`](braid_step::Context).
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//! ├── run(pipeline, input, cancel)            - seed under the input key
//! └── run_with_context(pipeline, ctx, cancel) - seed with a whole context
//!
//! evaluate(node, ctx)
//! ├── Step       - resolve declared keys, take a pool permit, execute
//! ├── Sequential - thread one context through the children in order
//! └── Parallel   - fork the context per branch, spawn every branch,
//!                  wait for all of them, merge deltas in declaration order
//!
//! PipelineRunner
//! └── start(cancel) - channel-fed loop running one pipeline per payload
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use braid_orchestrator::{Orchestrator, RuntimeConfig};
//!
//! let orchestrator = Orchestrator::new(RuntimeConfig { max_concurrency: 4 });
//! let outcome = orchestrator
//!     .run(&pipeline, serde_json::json!({ "invoice": 42 }), CancellationToken::new())
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&outcome.context)?);
//! ```

mod error;
mod evaluate;
mod events;
mod runner;
mod runtime;

pub use error::{AggregateError, BranchFailure, RunError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use runner::PipelineRunner;
pub use runtime::{DEFAULT_INPUT_KEY, Orchestrator, RunOutcome, RuntimeConfig};
