//! Sequential runs: failure classification and early stop

use crate::helpers::*;
use crate::mock_invoker::MockInvoker;
use chorus::{InvokeError, PassStrategy, RunStatus, StepError, StepSpec, ToolMode};
use std::sync::Arc;

#[tokio::test]
async fn test_first_step_failure_fails_the_run() {
    let invoker = Arc::new(
        MockInvoker::new().fail("m1", InvokeError::Unavailable("connection refused".into())),
    );
    let spec = sequential(
        vec![step("m1"), step("m2"), step("m3")],
        PassStrategy::Accumulate,
    );

    let result = engine_with(invoker.clone())
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await
        .unwrap();

    // Nothing usable was produced, and later steps never ran
    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.steps.len(), 1);
    assert!(result.final_text.is_empty());
    assert_eq!(invoker.call_count(), 1);
    assert!(matches!(
        result.steps[0].error,
        Some(StepError::Invoke(InvokeError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn test_middle_step_failure_keeps_earlier_output() {
    let invoker = Arc::new(
        MockInvoker::new()
            .respond("m1", "solid first answer")
            .fail("m2", InvokeError::Timeout(5)),
    );
    let spec = sequential(
        vec![step("m1"), step("m2"), step("m3")],
        PassStrategy::Accumulate,
    );

    let result = engine_with(invoker.clone())
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Partial);
    assert_eq!(result.steps.len(), 2);
    assert!(result.steps[0].is_ok());
    assert!(!result.steps[1].is_ok());
    // Best available text is the last successful output
    assert_eq!(result.final_text, "solid first answer");
    // Step 3 was never invoked
    assert_eq!(invoker.call_count(), 2);
}

#[tokio::test]
async fn test_forbidden_tool_stops_the_run_even_in_yolo() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = sequential(
        vec![
            step("m1"),
            StepSpec::new("m2").with_tools(vec!["shell rm -rf /".to_string()]),
            step("m3"),
        ],
        PassStrategy::Accumulate,
    );

    let result = engine_with(invoker.clone())
        .run(&spec, input("q"), ToolMode::Yolo)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Partial);
    assert_eq!(result.steps.len(), 2);
    assert!(matches!(
        result.steps[1].error,
        Some(StepError::GateDenied(_))
    ));
    // The gated step's model was never contacted
    assert_eq!(invoker.call_count(), 1);
}

#[tokio::test]
async fn test_tool_mode_forbidden_denies_tool_steps() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = sequential(
        vec![StepSpec::new("m1").with_tools(vec!["shell ls".to_string()])],
        PassStrategy::Accumulate,
    );

    let result = engine_with(invoker.clone())
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert!(matches!(
        result.steps[0].error,
        Some(StepError::GateDenied(_))
    ));
    assert_eq!(invoker.call_count(), 0);
}

#[tokio::test]
async fn test_empty_spec_is_rejected_before_any_call() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = sequential(vec![], PassStrategy::Accumulate);

    let result = engine_with(invoker.clone())
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await;

    assert!(result.is_err());
    assert_eq!(invoker.call_count(), 0);
}
