//! Parallel runner - independent branches over the same input

use crate::{
    core::{PipelineSpec, StepError, StepResult, StepSpec, UserInput},
    engine::engine::{RunEvent, RunnerContext},
    gate::ToolMode,
    model::{InvokeError, Message},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Runs every step against the same original input as an independent
/// concurrent task, bounded by `max_parallel`. One branch's failure,
/// timeout, or gate denial never blocks or alters its siblings; results
/// are returned in declared step order regardless of completion order.
pub struct ParallelRunner {
    context: RunnerContext,
}

impl ParallelRunner {
    pub(crate) fn new(context: RunnerContext) -> Self {
        Self { context }
    }

    pub async fn execute(
        &self,
        spec: &PipelineSpec,
        input: &UserInput,
        tool_mode: ToolMode,
    ) -> Vec<StepResult> {
        let total = spec.steps.len();
        let semaphore = Arc::new(Semaphore::new(self.context.max_parallel));
        let mut tasks: JoinSet<StepResult> = JoinSet::new();

        for (index, step) in spec.steps.iter().cloned().enumerate() {
            let context = self.context.clone();
            let input = input.clone();
            let semaphore = semaphore.clone();
            let timeout_secs = spec.timeout_secs;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                run_branch(context, index, step, input, tool_mode, timeout_secs).await
            });
        }

        // Collect in completion order, then restore declared order
        let mut slots: Vec<Option<StepResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    let index = result.index;
                    slots[index] = Some(result);
                }
                Err(e) => error!("Branch task failed to join: {}", e),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let step = &spec.steps[index];
                    StepResult::err(
                        index,
                        step.label(),
                        &step.model_id,
                        StepError::Invoke(InvokeError::Unavailable(
                            "branch task aborted".to_string(),
                        )),
                        Utc::now(),
                    )
                })
            })
            .collect()
    }
}

/// One branch: gate clearance, then a single invocation of the branch model
/// with the unmodified original input
async fn run_branch(
    context: RunnerContext,
    index: usize,
    step: StepSpec,
    input: UserInput,
    tool_mode: ToolMode,
    timeout_secs: Option<u64>,
) -> StepResult {
    let label = step.label().to_string();
    let started_at = Utc::now();

    if context.is_cancelled() {
        warn!("Branch {} ({}) cancelled before start", index, label);
        return StepResult::err(index, label, &step.model_id, StepError::Cancelled, started_at);
    }

    context.emit(RunEvent::StepStarted {
        index,
        label: label.clone(),
        model_id: step.model_id.clone(),
    });

    let allow_tools = match context.clear_tools(&step, tool_mode).await {
        Ok(allowed) => allowed,
        Err(error) => {
            context.emit(RunEvent::StepFailed {
                index,
                label: label.clone(),
                error: error.to_string(),
            });
            return StepResult::err(index, label, &step.model_id, error, started_at);
        }
    };

    let messages = vec![Message::user(&input.prompt).with_images(input.attachments.clone())];
    let system_prompt = step
        .system_prompt
        .as_deref()
        .or(input.system_prompt.as_deref());

    match context
        .invoke(
            &step.model_id,
            system_prompt,
            &messages,
            &step.options,
            allow_tools,
            timeout_secs,
        )
        .await
    {
        Ok(output) => {
            info!("Branch {} ({}) completed", index, label);
            context.emit(RunEvent::StepCompleted {
                index,
                label: label.clone(),
                output: output.clone(),
            });
            StepResult::ok(index, label, &step.model_id, output, started_at)
        }
        Err(error) => {
            warn!("Branch {} ({}) failed: {}", index, label, error);
            context.emit(RunEvent::StepFailed {
                index,
                label: label.clone(),
                error: error.to_string(),
            });
            StepResult::err(
                index,
                label,
                &step.model_id,
                StepError::Invoke(error),
                started_at,
            )
        }
    }
}
