//! Aggregation of parallel branch outputs

use crate::{
    core::{Aggregation, AggregationMethod, StepResult},
    engine::engine::{RunEvent, RunnerContext},
    model::{InvokeError, Message, ModelOptions},
};
use thiserror::Error;
use tracing::{info, warn};

/// Fallback system prompt for synthesis aggregation
pub const DEFAULT_SYNTHESIS_PROMPT: &str = "You have received multiple expert \
responses to the same question. Analyze them, identify common insights and \
disagreements, then provide a comprehensive synthesis that combines the best \
aspects of each response.";

#[derive(Debug, Error)]
pub enum AggregateError {
    /// Zero successful branches; the synthesizer is never called with
    /// empty content
    #[error("no successful branch outputs to aggregate")]
    NoViableInput,

    /// The synthesizer call itself failed
    #[error("synthesis call failed: {0}")]
    Synthesis(#[from] InvokeError),
}

/// Combines successful parallel branch outputs into one final text
pub struct Aggregator {
    context: RunnerContext,
}

impl Aggregator {
    pub(crate) fn new(context: RunnerContext) -> Self {
        Self { context }
    }

    /// `results` must be the successful subset, already in declared step
    /// order; callers filter failures out before aggregation.
    pub async fn aggregate(
        &self,
        results: &[&StepResult],
        aggregation: &Aggregation,
        timeout_secs: Option<u64>,
    ) -> Result<String, AggregateError> {
        if results.is_empty() {
            return Err(AggregateError::NoViableInput);
        }

        match aggregation.method {
            AggregationMethod::BestOf => Ok(best_of(results)),
            AggregationMethod::Synthesis => {
                let model_id = match aggregation.synthesizer_model_id.as_deref() {
                    Some(model_id) => model_id,
                    None => {
                        // Spec validation rejects this before execution;
                        // degrade rather than panic if reached anyway.
                        warn!("Synthesis aggregation without synthesizer model");
                        return Ok(best_of(results));
                    }
                };

                info!("Synthesizing {} responses with {}", results.len(), model_id);
                self.context.emit(RunEvent::SynthesisStarted {
                    model_id: model_id.to_string(),
                });

                let system_prompt = aggregation
                    .synthesis_prompt
                    .as_deref()
                    .unwrap_or(DEFAULT_SYNTHESIS_PROMPT);

                let mut content = String::new();
                for (i, result) in results.iter().enumerate() {
                    content.push_str(&format!(
                        "--- Response {} ({} - {}) ---\n{}\n\n",
                        i + 1,
                        result.role,
                        result.model_id,
                        result.output
                    ));
                }

                let synthesis = self
                    .context
                    .invoke(
                        model_id,
                        Some(system_prompt),
                        &[Message::user(content)],
                        &ModelOptions::new(),
                        false,
                        timeout_secs,
                    )
                    .await?;

                Ok(synthesis)
            }
        }
    }
}

/// Presentation pass-through: the successful outputs, labeled, in declared
/// order. Deterministic, no model call, no ranking.
pub fn best_of(results: &[&StepResult]) -> String {
    let mut parts = Vec::new();
    let rule = "=".repeat(60);
    for (i, result) in results.iter().enumerate() {
        parts.push(format!(
            "{rule}\nResponse {} ({} - {}):\n{rule}\n{}\n",
            i + 1,
            result.role,
            result.model_id,
            result.output
        ));
    }
    parts.join("\n")
}
