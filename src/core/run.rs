//! Run artifacts - what one engine invocation consumes and produces

use crate::model::InvokeError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// The caller's input to one pipeline run
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    /// The original user prompt
    pub prompt: String,

    /// Run-level system prompt. The first sequential step and every
    /// parallel branch fall back to it when the step declares none.
    pub system_prompt: Option<String>,

    /// Image attachments handed to the first model contact of each branch
    pub attachments: Vec<PathBuf>,
}

impl UserInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<PathBuf>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Why a step produced no usable output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// The safety gate (or the user at an ASK prompt) refused tool use
    #[error("Tool use denied: {0}")]
    GateDenied(String),

    /// The run was cancelled before this step could start
    #[error("Cancelled before execution")]
    Cancelled,
}

/// Record of one step invocation within a run
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Position in the declared step order
    pub index: usize,

    /// Step label (role if declared, model id otherwise)
    pub role: String,

    pub model_id: String,

    /// Generated text; empty when the step errored
    pub output: String,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    pub error: Option<StepError>,
}

impl StepResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Build a success record
    pub fn ok(
        index: usize,
        role: impl Into<String>,
        model_id: impl Into<String>,
        output: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            index,
            role: role.into(),
            model_id: model_id.into(),
            output: output.into(),
            started_at,
            finished_at: Utc::now(),
            error: None,
        }
    }

    /// Build an error record
    pub fn err(
        index: usize,
        role: impl Into<String>,
        model_id: impl Into<String>,
        error: StepError,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            index,
            role: role.into(),
            model_id: model_id.into(),
            output: String::new(),
            started_at,
            finished_at: Utc::now(),
            error: Some(error),
        }
    }
}

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every step produced usable output
    Ok,
    /// Some steps failed but a usable partial answer exists
    Partial,
    /// No step produced usable output
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Ok => write!(f, "ok"),
            RunStatus::Partial => write!(f, "partial"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal artifact of one engine invocation
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub run_id: Uuid,

    pub pipeline: String,

    pub status: RunStatus,

    /// Best available text: the final/aggregated output for ok runs, the
    /// last usable output for partial ones, empty for failed ones
    pub final_text: String,

    /// Full ordered trace of step outcomes
    pub steps: Vec<StepResult>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl PipelineResult {
    pub fn succeeded_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| s.is_ok())
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| !s.is_ok())
    }
}
