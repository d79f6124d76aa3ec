//! Engine entry point - validates, dispatches, classifies

use crate::{
    core::{
        PipelineKind, PipelineResult, PipelineSpec, RunStatus, StepError, StepResult, StepSpec,
        UserInput,
    },
    engine::{
        aggregate::{AggregateError, Aggregator},
        parallel::ParallelRunner,
        sequential::SequentialRunner,
        EngineError,
    },
    gate::{AutoRefuse, Confirmer, GateDecision, ShellGate, ToolGate, ToolMode},
    model::{InvokeError, Message, ModelInvoker, ModelOptions},
    store::PipelineStore,
};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Default bound on concurrent branches of a parallel run
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Events emitted while a run progresses
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        run_id: Uuid,
        pipeline: String,
        kind: PipelineKind,
        total_steps: usize,
    },
    StepStarted {
        index: usize,
        label: String,
        model_id: String,
    },
    StepCompleted {
        index: usize,
        label: String,
        output: String,
    },
    StepFailed {
        index: usize,
        label: String,
        error: String,
    },
    SynthesisStarted {
        model_id: String,
    },
    RunCompleted {
        run_id: Uuid,
        status: RunStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Shared state the runners need, cheap to clone into branch tasks
#[derive(Clone)]
pub(crate) struct RunnerContext {
    pub invoker: Arc<dyn ModelInvoker>,
    pub gate: Arc<dyn ToolGate>,
    pub confirmer: Arc<dyn Confirmer>,
    pub cancelled: Arc<AtomicBool>,
    pub handlers: Arc<Vec<EventHandler>>,
    pub max_parallel: usize,
}

impl RunnerContext {
    pub fn emit(&self, event: RunEvent) {
        for handler in self.handlers.iter() {
            handler(event.clone());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear a step's requested tool actions through the gate.
    ///
    /// Returns whether the invocation may enable tools. A Deny (or a
    /// refused ASK) fails the step with `GateDenied` before the model is
    /// ever contacted; entries are `action` optionally followed by
    /// whitespace and argument text the gate can pattern-match.
    pub async fn clear_tools(
        &self,
        step: &StepSpec,
        mode: ToolMode,
    ) -> Result<bool, StepError> {
        if !step.wants_tools() {
            return Ok(false);
        }

        for entry in &step.tools {
            let (action, args) = match entry.split_once(char::is_whitespace) {
                Some((action, args)) => (action, args.trim()),
                None => (entry.as_str(), ""),
            };

            match self.gate.decide(action, args, mode) {
                GateDecision::Allow => {}
                GateDecision::Deny(reason) => {
                    return Err(StepError::GateDenied(reason));
                }
                GateDecision::Ask => {
                    if !self.confirmer.confirm(action, args).await {
                        return Err(StepError::GateDenied(format!(
                            "'{}' refused at confirmation prompt",
                            action
                        )));
                    }
                }
            }
        }

        Ok(true)
    }

    /// One gated model invocation with the optional run-level deadline
    pub async fn invoke(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        messages: &[Message],
        options: &ModelOptions,
        allow_tools: bool,
        timeout_secs: Option<u64>,
    ) -> Result<String, InvokeError> {
        let call = self
            .invoker
            .invoke(model_id, system_prompt, messages, options, allow_tools);

        match timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(std::time::Duration::from_secs(secs), call).await {
                    Ok(result) => result,
                    Err(_) => Err(InvokeError::Timeout(secs)),
                }
            }
            None => call.await,
        }
    }
}

/// Main pipeline engine
///
/// Owns the collaborators and a cancellation flag; `run()` never shares its
/// working state across concurrent invocations.
pub struct Engine {
    store: Arc<dyn PipelineStore>,
    context: RunnerContext,
    handlers: Vec<EventHandler>,
}

impl Engine {
    pub fn new(invoker: Arc<dyn ModelInvoker>, store: Arc<dyn PipelineStore>) -> Self {
        Self {
            store,
            context: RunnerContext {
                invoker,
                gate: Arc::new(ShellGate::new()),
                confirmer: Arc::new(AutoRefuse),
                cancelled: Arc::new(AtomicBool::new(false)),
                handlers: Arc::new(Vec::new()),
                max_parallel: DEFAULT_MAX_PARALLEL,
            },
            handlers: Vec::new(),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn ToolGate>) -> Self {
        self.context.gate = gate;
        self
    }

    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.context.confirmer = confirmer;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.context.max_parallel = max_parallel.max(1);
        self
    }

    /// Add an event handler; handlers observe every run of this engine
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(RunEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    /// Flag checked at step boundaries (sequential) and before each branch
    /// start (parallel). Setting it stops the run issuing new model calls.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.context.cancelled.clone()
    }

    /// Pipelines visible to this engine
    pub fn list_pipelines(&self) -> Vec<crate::store::PipelineSummary> {
        self.store.list()
    }

    /// Resolve a pipeline by name and run it
    pub async fn run_pipeline(
        &self,
        name: &str,
        input: UserInput,
        tool_mode: ToolMode,
    ) -> Result<PipelineResult, EngineError> {
        let spec = self
            .store
            .resolve(name)
            .ok_or_else(|| EngineError::PipelineNotFound(name.to_string()))?;
        self.run(&spec, input, tool_mode).await
    }

    /// Execute one pipeline run
    pub async fn run(
        &self,
        spec: &PipelineSpec,
        input: UserInput,
        tool_mode: ToolMode,
    ) -> Result<PipelineResult, EngineError> {
        spec.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut context = self.context.clone();
        context.handlers = Arc::new(self.handlers.clone());
        if let Some(limit) = spec.max_parallel {
            context.max_parallel = limit.max(1);
        }

        info!("Starting pipeline run: {} ({})", spec.name, run_id);
        context.emit(RunEvent::RunStarted {
            run_id,
            pipeline: spec.name.clone(),
            kind: spec.kind,
            total_steps: spec.steps.len(),
        });

        let (steps, final_text, status) = match spec.kind {
            PipelineKind::Sequential => {
                let steps = SequentialRunner::new(context.clone())
                    .execute(spec, &input, tool_mode)
                    .await;
                let status = classify_sequential(&steps, spec.steps.len());
                let final_text = steps
                    .iter()
                    .rev()
                    .find(|s| s.is_ok())
                    .map(|s| s.output.clone())
                    .unwrap_or_default();
                (steps, final_text, status)
            }
            PipelineKind::Parallel => {
                let steps = ParallelRunner::new(context.clone())
                    .execute(spec, &input, tool_mode)
                    .await;
                self.aggregate_parallel(spec, steps, &context).await
            }
        };

        let result = PipelineResult {
            run_id,
            pipeline: spec.name.clone(),
            status,
            final_text,
            steps,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            "Pipeline run finished: {} - {}",
            result.pipeline, result.status
        );
        context.emit(RunEvent::RunCompleted {
            run_id,
            status: result.status,
        });

        Ok(result)
    }

    /// Combine parallel branch results. Aggregation only ever sees the
    /// successful subset; with zero successes it is never called at all.
    async fn aggregate_parallel(
        &self,
        spec: &PipelineSpec,
        steps: Vec<StepResult>,
        context: &RunnerContext,
    ) -> (Vec<StepResult>, String, RunStatus) {
        let succeeded: Vec<&StepResult> = steps.iter().filter(|s| s.is_ok()).collect();

        if succeeded.is_empty() {
            return (steps, String::new(), RunStatus::Failed);
        }

        let all_ok = succeeded.len() == steps.len();
        let aggregation = spec.aggregation();
        let aggregator = Aggregator::new(context.clone());

        match aggregator
            .aggregate(&succeeded, &aggregation, spec.timeout_secs)
            .await
        {
            Ok(text) => {
                let status = if all_ok { RunStatus::Ok } else { RunStatus::Partial };
                (steps, text, status)
            }
            Err(AggregateError::NoViableInput) => (steps, String::new(), RunStatus::Failed),
            Err(AggregateError::Synthesis(e)) => {
                // The branches themselves succeeded; surface their raw
                // outputs instead of losing the run.
                warn!("Synthesis failed, falling back to joined outputs: {}", e);
                let joined = succeeded
                    .iter()
                    .map(|s| s.output.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n---\n\n");
                (steps, joined, RunStatus::Partial)
            }
        }
    }
}

/// Classification rule for sequential runs: failed only if the first step
/// failed; partial when a later step failed or cancellation cut the run
/// short; ok when everything ran and succeeded.
fn classify_sequential(steps: &[StepResult], declared: usize) -> RunStatus {
    match steps.first() {
        None => RunStatus::Failed,
        Some(first) if !first.is_ok() => RunStatus::Failed,
        Some(_) => {
            let complete = steps.len() == declared && steps.iter().all(|s| s.is_ok());
            if complete {
                RunStatus::Ok
            } else {
                RunStatus::Partial
            }
        }
    }
}
