//! Parallel runs: ordering, aggregation, concurrency bounds

use crate::helpers::*;
use crate::mock_invoker::MockInvoker;
use chorus::{RunStatus, StepSpec, ToolMode};
use std::sync::Arc;

#[tokio::test]
async fn test_results_follow_declared_order_not_completion_order() {
    // The first branch is the slowest; its result must still come first
    let invoker = Arc::new(
        MockInvoker::new()
            .respond("slow", "slow output")
            .respond("fast", "fast output")
            .respond("medium", "medium output")
            .with_delay("slow", 80)
            .with_delay("medium", 30),
    );
    let spec = parallel(
        vec![step("slow"), step("fast"), step("medium")],
        best_of(),
    );

    let result = engine_with(invoker)
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Ok);
    let order: Vec<(usize, &str)> = result
        .steps
        .iter()
        .map(|s| (s.index, s.model_id.as_str()))
        .collect();
    assert_eq!(order, vec![(0, "slow"), (1, "fast"), (2, "medium")]);

    // best_of presents outputs in the same declared order
    let slow_pos = result.final_text.find("slow output").unwrap();
    let fast_pos = result.final_text.find("fast output").unwrap();
    assert!(slow_pos < fast_pos);
}

#[tokio::test]
async fn test_three_branch_synthesis_makes_exactly_four_calls() {
    let invoker = Arc::new(
        MockInvoker::new()
            .respond("a", "take one")
            .respond("b", "take two")
            .respond("c", "take three")
            .respond("synth", "the combined answer"),
    );
    let spec = parallel(
        vec![step("a"), step("b"), step("c")],
        synthesis("synth"),
    );

    let result = engine_with(invoker.clone())
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Ok);
    assert_eq!(result.final_text, "the combined answer");
    assert_eq!(invoker.call_count(), 4);

    // The synthesizer sees every branch output, labeled
    let synth_call = invoker.invocations().into_iter().last().unwrap();
    assert_eq!(synth_call.model_id, "synth");
    assert!(synth_call.contents[0].contains("take one"));
    assert!(synth_call.contents[0].contains("take three"));
}

#[tokio::test]
async fn test_every_branch_gets_the_same_input() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = parallel(
        vec![
            step("a"),
            StepSpec::new("b").with_system_prompt("branch instructions"),
            step("c"),
        ],
        best_of(),
    );

    engine_with(invoker.clone())
        .run(
            &spec,
            input("shared question").with_system_prompt("run instructions"),
            ToolMode::Forbidden,
        )
        .await
        .unwrap();

    let calls = invoker.invocations();
    assert_eq!(calls.len(), 3);
    for call in &calls {
        assert_eq!(call.message_count, 1);
        assert_eq!(call.contents[0], "shared question");
    }

    // Branch system prompt wins; the run-level one is the fallback
    let by_model = |m: &str| {
        calls
            .iter()
            .find(|c| c.model_id == m)
            .unwrap()
            .system_prompt
            .clone()
    };
    assert_eq!(by_model("a").as_deref(), Some("run instructions"));
    assert_eq!(by_model("b").as_deref(), Some("branch instructions"));
}

#[tokio::test]
async fn test_max_parallel_one_still_completes_all_branches() {
    let invoker = Arc::new(MockInvoker::new());
    let mut spec = parallel(
        vec![step("a"), step("b"), step("c"), step("d")],
        best_of(),
    );
    spec.max_parallel = Some(1);

    let result = engine_with(invoker.clone())
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Ok);
    assert_eq!(result.steps.len(), 4);
    assert_eq!(invoker.call_count(), 4);
}
