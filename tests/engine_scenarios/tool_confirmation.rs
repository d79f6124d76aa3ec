//! Confirm mode: ASK verdicts suspend on the configured confirmer

use crate::helpers::*;
use crate::mock_invoker::MockInvoker;
use chorus::{AutoApprove, AutoRefuse, PassStrategy, RunStatus, StepError, StepSpec, ToolMode};
use std::sync::Arc;

#[tokio::test]
async fn test_confirmed_tool_step_is_invoked_with_tools() {
    let invoker = Arc::new(MockInvoker::new().respond("m1", "patched the file"));
    let spec = sequential(
        vec![StepSpec::new("m1").with_tools(vec!["shell cargo fmt".to_string()])],
        PassStrategy::Accumulate,
    );

    let engine = engine_with(invoker.clone()).with_confirmer(Arc::new(AutoApprove));
    let result = engine
        .run(&spec, input("q"), ToolMode::Confirm)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Ok);
    assert_eq!(result.final_text, "patched the file");
    let calls = invoker.invocations();
    assert_eq!(calls.len(), 1);
    // Approval carries through to the model call
    assert!(calls[0].allow_tools);
}

#[tokio::test]
async fn test_refused_tool_step_records_gate_denied() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = sequential(
        vec![StepSpec::new("m1").with_tools(vec!["shell cargo fmt".to_string()])],
        PassStrategy::Accumulate,
    );

    let engine = engine_with(invoker.clone()).with_confirmer(Arc::new(AutoRefuse));
    let result = engine
        .run(&spec, input("q"), ToolMode::Confirm)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert!(matches!(
        result.steps[0].error,
        Some(StepError::GateDenied(_))
    ));
    // The refused step's model was never contacted
    assert_eq!(invoker.call_count(), 0);
}

#[tokio::test]
async fn test_default_confirmer_refuses() {
    // Without an explicit confirmer the engine must not auto-approve
    let invoker = Arc::new(MockInvoker::new());
    let spec = sequential(
        vec![StepSpec::new("m1").with_tools(vec!["shell ls".to_string()])],
        PassStrategy::Accumulate,
    );

    let result = engine_with(invoker.clone())
        .run(&spec, input("q"), ToolMode::Confirm)
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
async fn test_refused_branch_leaves_siblings_running() {
    let invoker = Arc::new(
        MockInvoker::new()
            .respond("m1", "one")
            .respond("m3", "three"),
    );
    let spec = parallel(
        vec![
            step("m1"),
            StepSpec::new("m2").with_tools(vec!["shell cargo fmt".to_string()]),
            step("m3"),
        ],
        best_of(),
    );

    let engine = engine_with(invoker.clone()).with_confirmer(Arc::new(AutoRefuse));
    let result = engine
        .run(&spec, input("q"), ToolMode::Confirm)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Partial);
    assert!(result.steps[0].is_ok());
    assert!(matches!(
        result.steps[1].error,
        Some(StepError::GateDenied(_))
    ));
    assert!(result.steps[2].is_ok());
    assert_eq!(invoker.call_count(), 2);
}
