//! chorus - consensus pipelines for local Ollama models

pub mod cli;
pub mod core;
pub mod engine;
pub mod gate;
pub mod history;
pub mod media;
pub mod model;
pub mod store;
pub mod templates;

// Re-export commonly used types
pub use crate::core::{
    Aggregation, AggregationMethod, PassStrategy, PipelineKind, PipelineResult, PipelineSpec,
    RunStatus, StepError, StepResult, StepSpec, UserInput,
};
pub use engine::{Engine, EngineError, EventHandler, RunEvent};
pub use gate::{AutoApprove, AutoRefuse, Confirmer, GateDecision, ShellGate, ToolGate, ToolMode};
pub use history::{HistoryStore, InMemoryHistory, RunRecord};
pub use model::{InvokeError, InvokerConfig, Message, ModelInvoker, OllamaInvoker};
pub use store::{FilePipelineStore, InMemoryStore, PipelineStore, PipelineSummary};
pub use templates::TemplateStore;
