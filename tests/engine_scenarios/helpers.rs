//! Test utility functions

use crate::mock_invoker::MockInvoker;
use chorus::{
    Aggregation, AggregationMethod, Engine, PassStrategy, PipelineKind, PipelineSpec, StepSpec,
    UserInput,
};
use std::sync::Arc;

pub fn step(model_id: &str) -> StepSpec {
    StepSpec::new(model_id)
}

pub fn sequential(steps: Vec<StepSpec>, pass_strategy: PassStrategy) -> PipelineSpec {
    PipelineSpec {
        name: "test_sequential".to_string(),
        description: None,
        kind: PipelineKind::Sequential,
        steps,
        pass_strategy: Some(pass_strategy),
        aggregation: None,
        max_parallel: None,
        timeout_secs: None,
    }
}

pub fn parallel(steps: Vec<StepSpec>, aggregation: Aggregation) -> PipelineSpec {
    PipelineSpec {
        name: "test_parallel".to_string(),
        description: None,
        kind: PipelineKind::Parallel,
        steps,
        pass_strategy: None,
        aggregation: Some(aggregation),
        max_parallel: None,
        timeout_secs: None,
    }
}

pub fn best_of() -> Aggregation {
    Aggregation {
        method: AggregationMethod::BestOf,
        synthesizer_model_id: None,
        synthesis_prompt: None,
    }
}

pub fn synthesis(model_id: &str) -> Aggregation {
    Aggregation {
        method: AggregationMethod::Synthesis,
        synthesizer_model_id: Some(model_id.to_string()),
        synthesis_prompt: None,
    }
}

pub fn engine_with(invoker: Arc<MockInvoker>) -> Engine {
    Engine::new(invoker, Arc::new(chorus::InMemoryStore::new()))
}

pub fn input(prompt: &str) -> UserInput {
    UserInput::new(prompt)
}
