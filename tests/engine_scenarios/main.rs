//! Scenario-based engine tests

mod helpers;
mod mock_invoker;

mod cancellation;
mod parallel_flow;
mod sequential_failure;
mod sequential_flow;
mod tool_confirmation;
