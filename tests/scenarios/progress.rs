//! Test: Progress - snapshots observed mid-run stay consistent

use crate::helpers::*;
use stations::core::{AnalysisKind, Execution, ExecutionStatus, OrchestratorConfig, StrategyKind};
use stations::execution::PipelineOrchestrator;
use std::sync::Arc;
use std::time::Duration;

fn steps() -> Vec<stations::core::Step> {
    vec![
        step("A", AnalysisKind::Quick),
        step("B", AnalysisKind::Characters),
        step("C", AnalysisKind::Themes).with_dependencies(["A"]),
        step("D", AnalysisKind::Full).with_dependencies(["C"]),
    ]
}

/// Poll an execution until it leaves `Running`, collecting every snapshot
async fn observe(orchestrator: &PipelineOrchestrator, id: &str) -> Vec<Execution> {
    let mut snapshots = Vec::new();
    loop {
        if let Some(execution) = orchestrator.get_execution(id).await {
            let finished = execution.status.is_terminal();
            snapshots.push(execution);
            if finished {
                return snapshots;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

async fn assert_progress_consistent(strategy: StrategyKind) {
    let gateway = Arc::new(MockGateway::new().with_delay(Duration::from_millis(30)));
    let config = OrchestratorConfig {
        strategy,
        ..OrchestratorConfig::default()
    };
    let orchestrator = orchestrator(gateway, &config);

    let (execution, snapshots) = tokio::join!(
        orchestrator.execute_pipeline("observed", steps(), script_input()),
        observe(&orchestrator, "observed"),
    );
    assert_execution_completed(&execution);

    let running: Vec<&Execution> = snapshots
        .iter()
        .filter(|s| s.status == ExecutionStatus::Running)
        .collect();
    assert!(!running.is_empty());
    for snapshot in &running {
        let expected = 100.0 * snapshot.results.len() as f64 / snapshot.steps.len() as f64;
        assert_eq!(snapshot.progress, expected);
    }
    assert!(running.iter().any(|s| s.progress > 0.0 && s.progress < 100.0));

    for pair in snapshots.windows(2) {
        assert!(
            pair[1].progress >= pair[0].progress,
            "progress went from {} to {}",
            pair[0].progress,
            pair[1].progress
        );
    }
    assert_eq!(snapshots.last().map(|s| s.progress), Some(100.0));
}

#[tokio::test]
async fn test_sequential_progress_matches_results() {
    assert_progress_consistent(StrategyKind::Sequential).await;
}

#[tokio::test]
async fn test_parallel_progress_matches_results() {
    assert_progress_consistent(StrategyKind::Parallel).await;
}
