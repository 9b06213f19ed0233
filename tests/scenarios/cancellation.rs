//! Test: Cancellation - cooperative stop of a running execution

use crate::helpers::*;
use stations::core::{AnalysisKind, ExecutionStatus, OrchestratorConfig};
use stations::execution::ExecutionEvent;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn test_cancel_discards_in_flight_result() {
    let gateway = Arc::new(MockGateway::new().with_delay(Duration::from_millis(200)));
    let orchestrator = Arc::new(orchestrator(gateway.clone(), &OrchestratorConfig::default()));

    let events = Arc::new(Mutex::new(Vec::new()));
    {
        let events = events.clone();
        orchestrator
            .add_event_handler(move |event| events.lock().unwrap().push(event))
            .await;
    }

    let run = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let steps = vec![
                step("A", AnalysisKind::Quick),
                step("B", AnalysisKind::Themes),
                step("C", AnalysisKind::Full),
            ];
            orchestrator
                .execute_pipeline("cancel-me", steps, script_input())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orchestrator.cancel_execution("cancel-me").await);

    let cancelled = orchestrator.get_execution("cancel-me").await.unwrap();
    assert_eq!(cancelled.status, ExecutionStatus::Failed);
    let end_time = cancelled.end_time;
    assert!(end_time.is_some());

    let execution = run.await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.failure.as_deref(), Some("cancelled"));
    assert!(execution.results.is_empty());
    assert_eq!(execution.end_time, end_time);

    // Only the in-flight step reached the model
    assert_eq!(gateway.calls(), 1);
    assert!(events.lock().unwrap().iter().any(|e| matches!(
        e,
        ExecutionEvent::StepDiscarded { step_id, .. } if step_id == "A"
    )));
}

#[tokio::test]
async fn test_cancel_finished_or_unknown_is_false() {
    let gateway = Arc::new(MockGateway::new());
    let orchestrator = orchestrator(gateway, &OrchestratorConfig::default());

    let execution = orchestrator
        .execute_pipeline("done", vec![step("A", AnalysisKind::Quick)], script_input())
        .await;
    assert_eq!(execution.status, ExecutionStatus::Completed);

    assert!(!orchestrator.cancel_execution("done").await);
    assert!(!orchestrator.cancel_execution("never-existed").await);

    let still_completed = orchestrator.get_execution("done").await.unwrap();
    assert_eq!(still_completed.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_cleanup_removes_only_finished_executions() {
    let gateway = Arc::new(MockGateway::new().with_delay(Duration::from_millis(200)));
    let orchestrator = Arc::new(orchestrator(gateway, &OrchestratorConfig::default()));

    orchestrator
        .execute_pipeline("finished", vec![step("A", AnalysisKind::Quick)], script_input())
        .await;

    let run = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .execute_pipeline("running", vec![step("A", AnalysisKind::Themes)], script_input())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Nothing finished more than a day ago
    assert_eq!(orchestrator.cleanup_old_executions(24).await, 0);

    // Everything finished before now, but the running one has no end time
    assert_eq!(orchestrator.cleanup_old_executions(0).await, 1);
    assert!(orchestrator.get_execution("finished").await.is_none());
    assert!(orchestrator.get_execution("running").await.is_some());

    let execution = run.await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
}
