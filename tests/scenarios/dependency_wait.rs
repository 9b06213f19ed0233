//! Test: Dependency Wait - bounded waits for missing dependencies

use crate::helpers::*;
use stations::core::{AnalysisKind, ExecutionStatus, OrchestratorConfig};
use std::sync::Arc;
use std::time::Instant;

fn short_wait() -> OrchestratorConfig {
    OrchestratorConfig {
        max_dependency_wait_ms: 100,
        ..OrchestratorConfig::default()
    }
}

#[tokio::test]
async fn test_missing_dependency_fails_execution() {
    let gateway = Arc::new(MockGateway::new());
    let orchestrator = orchestrator(gateway.clone(), &short_wait());

    let steps = vec![
        step("A", AnalysisKind::Quick),
        step("B", AnalysisKind::Themes).with_dependencies(["ghost"]),
        step("C", AnalysisKind::Full),
    ];

    let started = Instant::now();
    let execution = orchestrator
        .execute_pipeline("missing-dep", steps, script_input())
        .await;

    assert!(started.elapsed().as_millis() >= 100);
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.end_time.is_some());
    assert_eq!(result_order(&execution), vec!["A"]);
    assert_eq!(execution.progress, 100.0 / 3.0);

    let failure = execution.failure.unwrap();
    assert!(failure.contains("Dependencies not satisfied for step B"), "{}", failure);
    assert!(failure.contains("ghost"));

    // C is never attempted after the abort
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn test_forward_dependency_times_out_sequentially() {
    // B is declared before its dependency, so sequential order can never satisfy it
    let gateway = Arc::new(MockGateway::new());
    let orchestrator = orchestrator(gateway, &short_wait());

    let steps = vec![
        step("B", AnalysisKind::Themes).with_dependencies(["A"]),
        step("A", AnalysisKind::Quick),
    ];
    let execution = orchestrator
        .execute_pipeline("forward-dep", steps, script_input())
        .await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.results.is_empty());
}

#[tokio::test]
async fn test_steps_without_dependencies_never_wait() {
    let gateway = Arc::new(MockGateway::new());
    let config = OrchestratorConfig {
        max_dependency_wait_ms: 0,
        ..OrchestratorConfig::default()
    };
    let orchestrator = orchestrator(gateway, &config);

    let steps = vec![step("A", AnalysisKind::Quick), step("B", AnalysisKind::Themes)];
    let execution = orchestrator
        .execute_pipeline("no-deps", steps, script_input())
        .await;

    assert_execution_completed(&execution);
}
