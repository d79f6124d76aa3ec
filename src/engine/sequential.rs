//! Sequential runner - steps strictly in order, context passed forward

use crate::{
    core::{PassStrategy, PipelineSpec, StepError, StepResult, StepSpec, UserInput},
    engine::engine::{RunEvent, RunnerContext},
    gate::ToolMode,
    model::Message,
};
use chrono::Utc;
use tracing::{debug, info, warn};

/// System prompt for the extra compression call the `synthesis` pass
/// strategy makes before each step beyond the first
pub const SUMMARIZE_SYSTEM_PROMPT: &str = "You condense intermediate analyses. \
Summarize the step outputs you are given into one compact brief that preserves \
every key finding, decision, and open disagreement. Reply with the brief only.";

/// Runs steps strictly in order; step i never starts before step i-1
/// finishes, and a failed step stops the run since later steps depend on
/// its output.
pub struct SequentialRunner {
    context: RunnerContext,
}

impl SequentialRunner {
    pub(crate) fn new(context: RunnerContext) -> Self {
        Self { context }
    }

    pub async fn execute(
        &self,
        spec: &PipelineSpec,
        input: &UserInput,
        tool_mode: ToolMode,
    ) -> Vec<StepResult> {
        let strategy = spec.pass_strategy();
        let mut results: Vec<StepResult> = Vec::with_capacity(spec.steps.len());

        // Alternating user/assistant history, grown after every step for
        // the accumulate strategy
        let mut history: Vec<Message> =
            vec![Message::user(&input.prompt).with_images(input.attachments.clone())];

        for (index, step) in spec.steps.iter().enumerate() {
            if self.context.is_cancelled() {
                warn!("Run cancelled at step boundary {}", index);
                break;
            }

            let label = step.label().to_string();
            let started_at = Utc::now();
            self.context.emit(RunEvent::StepStarted {
                index,
                label: label.clone(),
                model_id: step.model_id.clone(),
            });

            let allow_tools = match self.context.clear_tools(step, tool_mode).await {
                Ok(allowed) => allowed,
                Err(error) => {
                    self.record_failure(&mut results, index, &label, step, error, started_at);
                    break;
                }
            };

            let messages = match self
                .assemble(index, strategy, input, &history, step, spec.timeout_secs)
                .await
            {
                Ok(messages) => messages,
                Err(error) => {
                    self.record_failure(&mut results, index, &label, step, error, started_at);
                    break;
                }
            };
            debug!("Step {} receives {} messages", index, messages.len());

            let system_prompt = step
                .system_prompt
                .as_deref()
                .or(if index == 0 {
                    input.system_prompt.as_deref()
                } else {
                    None
                });

            match self
                .context
                .invoke(
                    &step.model_id,
                    system_prompt,
                    &messages,
                    &step.options,
                    allow_tools,
                    spec.timeout_secs,
                )
                .await
            {
                Ok(output) => {
                    info!("Step {} ({}) completed", index, label);
                    self.context.emit(RunEvent::StepCompleted {
                        index,
                        label: label.clone(),
                        output: output.clone(),
                    });
                    history.push(Message::assistant(&output));
                    results.push(StepResult::ok(
                        index,
                        label,
                        &step.model_id,
                        output,
                        started_at,
                    ));
                }
                Err(error) => {
                    self.record_failure(
                        &mut results,
                        index,
                        &label,
                        step,
                        StepError::Invoke(error),
                        started_at,
                    );
                    break;
                }
            }
        }

        results
    }

    /// Build step `index`'s message history according to the pass strategy
    async fn assemble(
        &self,
        index: usize,
        strategy: PassStrategy,
        input: &UserInput,
        history: &[Message],
        step: &StepSpec,
        timeout_secs: Option<u64>,
    ) -> Result<Vec<Message>, StepError> {
        if index == 0 {
            return Ok(vec![
                Message::user(&input.prompt).with_images(input.attachments.clone())
            ]);
        }

        match strategy {
            PassStrategy::Accumulate => Ok(history.to_vec()),
            PassStrategy::LastOnly => {
                // Constant-size context: original input plus the output of
                // the immediately preceding step
                let previous = history
                    .iter()
                    .rev()
                    .find(|m| m.role == crate::model::ChatRole::Assistant)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(vec![
                    Message::user(&input.prompt),
                    Message::user(format!("Previous step output:\n\n{}", previous)),
                ])
            }
            PassStrategy::Synthesis => {
                // One extra model call compresses all prior outputs into a
                // single summary, bounding context growth
                let prior: Vec<&str> = history
                    .iter()
                    .filter(|m| m.role == crate::model::ChatRole::Assistant)
                    .map(|m| m.content.as_str())
                    .collect();
                let joined = prior.join("\n\n---\n\n");

                debug!("Compressing {} prior outputs for step {}", prior.len(), index);
                let summary = self
                    .context
                    .invoke(
                        &step.model_id,
                        Some(SUMMARIZE_SYSTEM_PROMPT),
                        &[Message::user(joined)],
                        &step.options,
                        false,
                        timeout_secs,
                    )
                    .await
                    .map_err(StepError::Invoke)?;

                Ok(vec![
                    Message::user(&input.prompt),
                    Message::user(format!("Summary of previous steps:\n\n{}", summary)),
                ])
            }
        }
    }

    fn record_failure(
        &self,
        results: &mut Vec<StepResult>,
        index: usize,
        label: &str,
        step: &StepSpec,
        error: StepError,
        started_at: chrono::DateTime<Utc>,
    ) {
        warn!("Step {} ({}) failed: {}", index, label, error);
        self.context.emit(RunEvent::StepFailed {
            index,
            label: label.to_string(),
            error: error.to_string(),
        });
        results.push(StepResult::err(
            index,
            label,
            &step.model_id,
            error,
            started_at,
        ));
    }
}
