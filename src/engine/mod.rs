//! Consensus pipeline engine
//!
//! Interprets a `PipelineSpec` against an initial prompt and produces a
//! `PipelineResult` plus the full trace of intermediate step outputs.

pub mod aggregate;
pub mod engine;
pub mod parallel;
pub mod sequential;

pub use aggregate::{AggregateError, Aggregator};
pub use engine::{Engine, EventHandler, RunEvent};
pub use parallel::ParallelRunner;
pub use sequential::SequentialRunner;

use thiserror::Error;

/// Run-terminating failures. Step-level failures never reach this type;
/// they are captured in the step's `StepResult` instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or contradictory pipeline definition, rejected before any
    /// model call
    #[error("Invalid pipeline spec: {0}")]
    InvalidSpec(String),

    #[error("Pipeline '{0}' not found")]
    PipelineNotFound(String),

    /// Aggregation was requested with zero successful branches
    #[error("No viable input for aggregation")]
    NoViableInput,
}
