//! Test: Parallel strategies - concurrency without breaking dependencies

use crate::helpers::*;
use stations::core::{AnalysisKind, OrchestratorConfig, StrategyKind};
use std::sync::Arc;
use std::time::Duration;

fn config(strategy: StrategyKind, max_parallel: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        strategy,
        max_parallel,
        ..OrchestratorConfig::default()
    }
}

#[tokio::test]
async fn test_parallel_runs_independent_steps_together() {
    let gateway = Arc::new(MockGateway::new().with_delay(Duration::from_millis(100)));
    let orchestrator = orchestrator(gateway.clone(), &config(StrategyKind::Parallel, 4));

    let steps = vec![
        step("A", AnalysisKind::Characters),
        step("B", AnalysisKind::Themes),
        step("C", AnalysisKind::Structure),
        step("D", AnalysisKind::Full).with_dependencies(["A", "B", "C"]),
    ];
    let execution = orchestrator
        .execute_pipeline("parallel", steps, script_input())
        .await;

    assert_execution_completed(&execution);
    assert_eq!(gateway.max_in_flight(), 3);
    assert_eq!(result_order(&execution).last(), Some(&"D"));
}

#[tokio::test]
async fn test_limited_parallel_respects_bound() {
    let gateway = Arc::new(MockGateway::new().with_delay(Duration::from_millis(50)));
    let orchestrator = orchestrator(gateway.clone(), &config(StrategyKind::ParallelLimited, 2));

    let steps = vec![
        step("A", AnalysisKind::Characters),
        step("B", AnalysisKind::Themes),
        step("C", AnalysisKind::Structure),
        step("D", AnalysisKind::Screenplay),
        step("E", AnalysisKind::Quick),
    ];
    let execution = orchestrator
        .execute_pipeline("limited", steps, script_input())
        .await;

    assert_execution_completed(&execution);
    assert_eq!(execution.results.len(), 5);
    assert!(gateway.max_in_flight() <= 2);
}

#[tokio::test]
async fn test_sequential_never_overlaps() {
    let gateway = Arc::new(MockGateway::new().with_delay(Duration::from_millis(20)));
    let orchestrator = orchestrator(gateway.clone(), &OrchestratorConfig::default());

    let steps = vec![
        step("A", AnalysisKind::Characters),
        step("B", AnalysisKind::Themes),
        step("C", AnalysisKind::Structure),
    ];
    orchestrator
        .execute_pipeline("sequential", steps, script_input())
        .await;

    assert_eq!(gateway.max_in_flight(), 1);
}

#[tokio::test]
async fn test_parallel_forward_dependency_is_satisfied() {
    // Declaration order does not matter when every step waits for its own dependencies
    let gateway = Arc::new(MockGateway::new());
    let config = OrchestratorConfig {
        max_dependency_wait_ms: 1_000,
        ..config(StrategyKind::Parallel, 4)
    };
    let orchestrator = orchestrator(gateway, &config);

    let steps = vec![
        step("B", AnalysisKind::Themes).with_dependencies(["A"]),
        step("A", AnalysisKind::Quick),
    ];
    let execution = orchestrator
        .execute_pipeline("forward", steps, script_input())
        .await;

    assert_execution_completed(&execution);
    assert_eq!(result_order(&execution), vec!["A", "B"]);
}

#[tokio::test]
async fn test_parallel_missing_dependency_aborts() {
    let gateway = Arc::new(MockGateway::new().with_delay(Duration::from_millis(500)));
    let config = OrchestratorConfig {
        max_dependency_wait_ms: 50,
        ..config(StrategyKind::Parallel, 4)
    };
    let orchestrator = orchestrator(gateway, &config);

    let steps = vec![
        step("A", AnalysisKind::Quick),
        step("B", AnalysisKind::Themes).with_dependencies(["ghost"]),
    ];
    let execution = orchestrator
        .execute_pipeline("parallel-missing", steps, script_input())
        .await;

    assert_eq!(execution.status, stations::core::ExecutionStatus::Failed);
    assert!(execution.failure.unwrap().contains("ghost"));
}
