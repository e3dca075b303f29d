//! Braid Step
//!
//! The contract a unit of work must satisfy to take part in a braid
//! pipeline, plus the run-scoped [`Context`] it reads from.
//!
//! A step receives a [`StepInput`] holding exactly the keys it declared
//! (its linear dependencies and its back-references), and returns a single
//! JSON value. The orchestrator publishes that value under the step's
//! output key; the step never touches the context itself.

mod context;
mod error;
mod input;
mod retry;
mod step;

pub use context::Context;
pub use error::{ContextError, StepError};
pub use input::StepInput;
pub use retry::{Backoff, Retry, RetryPolicy};
pub use step::{FnStep, Step, step_fn};
