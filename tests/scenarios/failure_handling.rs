//! Test: Failure Handling - failed steps never fail the execution

use crate::helpers::*;
use stations::core::{AnalysisKind, OrchestratorConfig};
use std::sync::Arc;

#[tokio::test]
async fn test_failed_dependency_still_unblocks_dependent() {
    let gateway = Arc::new(MockGateway::new().failing(AnalysisKind::Characters));
    let orchestrator = orchestrator(gateway, &OrchestratorConfig::default());

    let steps = vec![
        step("A", AnalysisKind::Characters),
        step("B", AnalysisKind::Themes).with_dependencies(["A"]),
    ];
    let execution = orchestrator
        .execute_pipeline("failed-dep", steps, script_input())
        .await;

    assert_execution_completed(&execution);
    assert_step_failed(&execution, "A");
    assert_step_succeeded(&execution, "B");
    assert!(execution.results["A"]
        .error
        .as_deref()
        .unwrap()
        .contains("characters unavailable"));
    assert!(execution.failure.is_none());
}

#[tokio::test]
async fn test_every_step_failing_still_completes() {
    let gateway = Arc::new(
        MockGateway::new()
            .failing(AnalysisKind::Quick)
            .failing(AnalysisKind::Full),
    );
    let orchestrator = orchestrator(gateway, &OrchestratorConfig::default());

    let steps = vec![step("quick", AnalysisKind::Quick), step("full", AnalysisKind::Full)];
    let execution = orchestrator
        .execute_pipeline("all-fail", steps, script_input())
        .await;

    assert_execution_completed(&execution);
    assert_eq!(execution.failed_steps(), 2);
    assert_eq!(execution.successful_steps(), 0);
}

#[tokio::test]
async fn test_timeout_folds_into_failed_result() {
    let gateway = Arc::new(MockGateway::new().with_delay(std::time::Duration::from_millis(300)));
    let orchestrator = orchestrator(gateway, &OrchestratorConfig::default());

    let steps = vec![step("slow", AnalysisKind::Detailed)
        .with_timeout(std::time::Duration::from_millis(30))];
    let execution = orchestrator
        .execute_pipeline("timeout", steps, script_input())
        .await;

    assert_execution_completed(&execution);
    assert_step_failed(&execution, "slow");
    assert!(execution.results["slow"]
        .error
        .as_deref()
        .unwrap()
        .contains("timeout"));
}
