//! Test: Retry Behavior - attempts per step

use crate::helpers::*;
use stations::core::{AnalysisKind, OrchestratorConfig, Step};
use std::sync::Arc;

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let gateway = Arc::new(MockGateway::new().failing_first(2));
    let orchestrator = orchestrator(gateway.clone(), &OrchestratorConfig::default());

    // Default policy allows two retries
    let steps = vec![Step::new("A", AnalysisKind::Quick)];
    let execution = orchestrator
        .execute_pipeline("retry", steps, script_input())
        .await;

    assert_execution_completed(&execution);
    assert_step_succeeded(&execution, "A");
    assert_eq!(execution.results["A"].attempts, 3);
    assert_eq!(gateway.calls(), 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let gateway = Arc::new(MockGateway::new().failing(AnalysisKind::Quick));
    let orchestrator = orchestrator(gateway.clone(), &OrchestratorConfig::default());

    let steps = vec![Step::new("A", AnalysisKind::Quick).with_max_retries(1)];
    let execution = orchestrator
        .execute_pipeline("bounded", steps, script_input())
        .await;

    assert_step_failed(&execution, "A");
    assert_eq!(execution.results["A"].attempts, 2);
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn test_configured_default_retries() {
    let gateway = Arc::new(MockGateway::new().failing(AnalysisKind::Quick));
    let config = OrchestratorConfig {
        default_max_retries: 0,
        ..OrchestratorConfig::default()
    };
    let orchestrator = orchestrator(gateway.clone(), &config);

    let execution = orchestrator
        .execute_pipeline("no-retry", vec![Step::new("A", AnalysisKind::Quick)], script_input())
        .await;

    assert_eq!(execution.results["A"].attempts, 1);
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn test_retry_backoff_is_applied() {
    let gateway = Arc::new(MockGateway::new().failing_first(1));
    let config = OrchestratorConfig {
        retry_backoff_ms: 100,
        ..OrchestratorConfig::default()
    };
    let orchestrator = orchestrator(gateway, &config);

    let execution = orchestrator
        .execute_pipeline("backoff", vec![Step::new("A", AnalysisKind::Quick)], script_input())
        .await;

    let result = &execution.results["A"];
    assert!(result.success);
    assert_eq!(result.attempts, 2);
    assert!(result.duration_ms >= 100);
}
