//! Cooperative cancellation

use crate::helpers::*;
use crate::mock_invoker::MockInvoker;
use chorus::{PassStrategy, RunStatus, StepError, ToolMode};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_pre_cancelled_sequential_run_makes_no_calls() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = sequential(vec![step("m1"), step("m2")], PassStrategy::Accumulate);

    let engine = engine_with(invoker.clone());
    engine.cancel_flag().store(true, Ordering::SeqCst);

    let result = engine
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.steps.is_empty());
    assert_eq!(invoker.call_count(), 0);
}

#[tokio::test]
async fn test_sequential_cancel_takes_effect_at_step_boundary() {
    let invoker = Arc::new(
        MockInvoker::new()
            .respond("slow", "first output")
            .with_delay("slow", 80),
    );
    let spec = sequential(
        vec![step("slow"), step("m2"), step("m3")],
        PassStrategy::Accumulate,
    );

    let engine = engine_with(invoker.clone());
    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.store(true, Ordering::SeqCst);
    });

    let result = engine
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await
        .unwrap();

    // The in-flight step finished; nothing after it started
    assert_eq!(result.status, RunStatus::Partial);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.final_text, "first output");
    assert_eq!(invoker.call_count(), 1);
}

#[tokio::test]
async fn test_pre_cancelled_parallel_branches_record_cancelled() {
    let invoker = Arc::new(MockInvoker::new());
    let spec = parallel(vec![step("a"), step("b"), step("c")], best_of());

    let engine = engine_with(invoker.clone());
    engine.cancel_flag().store(true, Ordering::SeqCst);

    let result = engine
        .run(&spec, input("q"), ToolMode::Forbidden)
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.steps.len(), 3);
    assert!(result
        .steps
        .iter()
        .all(|s| matches!(s.error, Some(StepError::Cancelled))));
    assert_eq!(invoker.call_count(), 0);
}
