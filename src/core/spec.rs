//! Pipeline specifications
//!
//! A `PipelineSpec` is the immutable description of a pipeline, loaded once
//! per run from JSON or YAML. Field aliases accept the legacy document shape
//! (`type`, `models`, `name`) so older definition files keep working.

use crate::engine::EngineError;
use crate::model::ModelOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a pipeline executes its steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Steps run strictly in order, each consuming prior output
    Sequential,
    /// Steps run independently against the same input, then aggregate
    Parallel,
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineKind::Sequential => write!(f, "sequential"),
            PipelineKind::Parallel => write!(f, "parallel"),
        }
    }
}

/// What context a sequential step after the first receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStrategy {
    /// Full message history of all prior steps - context strictly grows
    Accumulate,
    /// Original input plus the immediately preceding output only
    LastOnly,
    /// One extra model call compresses prior outputs into a single summary
    Synthesis,
}

/// How parallel branch outputs are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Labeled concatenation of successful outputs, no model call
    BestOf,
    /// One synthesizer model call over the successful outputs
    Synthesis,
}

/// Aggregation settings for a parallel pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregation {
    pub method: AggregationMethod,

    /// Required when method is `synthesis`
    #[serde(default, alias = "synthesizer_model")]
    pub synthesizer_model_id: Option<String>,

    /// Overrides the built-in "combine these independent analyses" prompt
    #[serde(default)]
    pub synthesis_prompt: Option<String>,
}

/// One model invocation within a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    /// Model identifier as known to the local server
    #[serde(rename = "model", alias = "name")]
    pub model_id: String,

    /// Label only - shows up in the trace and aggregation labels
    #[serde(default)]
    pub role: Option<String>,

    /// Per-step system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Opaque key/value map passed through to the invoker unmodified
    #[serde(default)]
    pub options: ModelOptions,

    /// Tool actions this step wants; empty means no tool use
    #[serde(default)]
    pub tools: Vec<String>,
}

impl StepSpec {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            role: None,
            system_prompt: None,
            options: ModelOptions::new(),
            tools: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }

    /// Display label: role if present, otherwise the model id
    pub fn label(&self) -> &str {
        self.role.as_deref().unwrap_or(&self.model_id)
    }

    pub fn wants_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// Immutable description of a pipeline, loaded once per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Unique identifier; stores fill it in from the file stem or map key
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(alias = "type")]
    pub kind: PipelineKind,

    /// Non-empty; order is significant for sequential pipelines and fixes
    /// the trace order for parallel ones
    #[serde(alias = "models")]
    pub steps: Vec<StepSpec>,

    /// Sequential only
    #[serde(default)]
    pub pass_strategy: Option<PassStrategy>,

    /// Parallel only
    #[serde(default)]
    pub aggregation: Option<Aggregation>,

    /// Maximum concurrent branches for a parallel run
    #[serde(default)]
    pub max_parallel: Option<usize>,

    /// Per-invocation timeout override in seconds
    #[serde(default, alias = "timeout_seconds")]
    pub timeout_secs: Option<u64>,
}

impl PipelineSpec {
    /// Parse a pipeline definition from a JSON document
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a pipeline definition from a YAML document
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a definition file, picking the parser from the extension.
    /// The pipeline name defaults to the file stem when the document
    /// does not carry one.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut spec = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            _ => Self::from_json(&content)?,
        };
        if spec.name.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                spec.name = stem.to_string();
            }
        }
        Ok(spec)
    }

    /// Check the structural invariants. Violations reject the pipeline
    /// before any model call is made.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.steps.is_empty() {
            return Err(EngineError::InvalidSpec(format!(
                "pipeline '{}' has no steps",
                self.name
            )));
        }

        match self.kind {
            PipelineKind::Sequential => {
                if self.aggregation.is_some() {
                    return Err(EngineError::InvalidSpec(format!(
                        "sequential pipeline '{}' must not carry aggregation",
                        self.name
                    )));
                }
            }
            PipelineKind::Parallel => {
                if self.pass_strategy.is_some() {
                    return Err(EngineError::InvalidSpec(format!(
                        "parallel pipeline '{}' must not carry pass_strategy",
                        self.name
                    )));
                }
                if let Some(agg) = &self.aggregation {
                    if agg.method == AggregationMethod::Synthesis
                        && agg.synthesizer_model_id.is_none()
                    {
                        return Err(EngineError::InvalidSpec(format!(
                            "pipeline '{}' uses synthesis aggregation without a synthesizer model",
                            self.name
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Effective pass strategy for a sequential run
    pub fn pass_strategy(&self) -> PassStrategy {
        self.pass_strategy.unwrap_or(PassStrategy::Accumulate)
    }

    /// Effective aggregation for a parallel run
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation.clone().unwrap_or(Aggregation {
            method: AggregationMethod::BestOf,
            synthesizer_model_id: None,
            synthesis_prompt: None,
        })
    }
}
