//! Sequential runs: pass strategies and context shape

use crate::helpers::*;
use crate::mock_invoker::MockInvoker;
use chorus::{PassStrategy, RunStatus, ToolMode};
use std::sync::Arc;

#[tokio::test]
async fn test_accumulate_context_strictly_grows() {
    let invoker = Arc::new(
        MockInvoker::new()
            .respond("m1", "first answer")
            .respond("m2", "second answer")
            .respond("m3", "third answer"),
    );
    let spec = sequential(
        vec![step("m1"), step("m2"), step("m3")],
        PassStrategy::Accumulate,
    );

    let result = engine_with(invoker.clone())
        .run(&spec, input("the question"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Ok);
    assert_eq!(result.steps.len(), 3);
    assert_eq!(result.final_text, "third answer");

    // Each step sees everything its predecessor saw, plus one more message
    let calls = invoker.invocations();
    let counts: Vec<usize> = calls.iter().map(|c| c.message_count).collect();
    assert_eq!(counts, vec![1, 2, 3]);
    assert!(calls[2].contents.iter().any(|c| c.contains("first answer")));
    assert!(calls[2].contents.iter().any(|c| c.contains("second answer")));
}

#[tokio::test]
async fn test_last_only_context_stays_bounded() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = sequential(
        vec![step("m1"), step("m2"), step("m3"), step("m4"), step("m5")],
        PassStrategy::LastOnly,
    );

    let result = engine_with(invoker.clone())
        .run(&spec, input("the question"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Ok);

    // Bounded regardless of position: original input plus one predecessor
    let counts: Vec<usize> = invoker
        .invocations()
        .iter()
        .map(|c| c.message_count)
        .collect();
    assert_eq!(counts, vec![1, 2, 2, 2, 2]);

    // Step 5 sees step 4's output but not step 1's
    let last = &invoker.invocations()[4];
    assert!(last.contents.iter().any(|c| c.contains("m4 says ok")));
    assert!(!last.contents.iter().any(|c| c.contains("m1 says ok")));
}

#[tokio::test]
async fn test_synthesis_pass_adds_one_call_per_later_step() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = sequential(
        vec![step("m1"), step("m2"), step("m3")],
        PassStrategy::Synthesis,
    );

    let result = engine_with(invoker.clone())
        .run(&spec, input("the question"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Ok);
    // 3 step calls plus a summary call before step 2 and step 3
    assert_eq!(invoker.call_count(), 5);
}

#[tokio::test]
async fn test_system_prompt_reaches_first_step_only() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = sequential(
        vec![
            step("m1"),
            step("m2").with_system_prompt("you are the second opinion"),
            step("m3"),
        ],
        PassStrategy::Accumulate,
    );

    engine_with(invoker.clone())
        .run(
            &spec,
            input("q").with_system_prompt("run-level instructions"),
            ToolMode::Forbidden,
        )
        .await
        .unwrap();

    let calls = invoker.invocations();
    assert_eq!(calls[0].system_prompt.as_deref(), Some("run-level instructions"));
    assert_eq!(
        calls[1].system_prompt.as_deref(),
        Some("you are the second opinion")
    );
    assert_eq!(calls[2].system_prompt, None);
}
