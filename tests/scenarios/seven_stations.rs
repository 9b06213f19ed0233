//! Test: Seven Stations - catalogue-driven analysis runs

use crate::helpers::*;
use stations::core::{AnalysisKind, ExecutionStatus, OrchestratorConfig};
use stations::stations::{SevenStationsOptions, SevenStationsOrchestrator};
use std::sync::Arc;
use std::time::Duration;

fn seven_stations(gateway: Arc<MockGateway>) -> SevenStationsOrchestrator {
    let config = OrchestratorConfig::default();
    SevenStationsOrchestrator::new(orchestrator(gateway, &config), &config)
}

fn station_ids(execution: &stations::stations::SevenStationsExecution) -> Vec<&str> {
    execution.stations.iter().map(|s| s.station_id.as_str()).collect()
}

#[tokio::test]
async fn test_full_run() {
    let gateway = Arc::new(MockGateway::new());
    let orchestrator = seven_stations(gateway.clone());

    let execution = orchestrator
        .run_seven_stations_pipeline("script-1", "FADE IN:", SevenStationsOptions::new())
        .await;

    assert!(execution.overall_success);
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.stations.len(), 7);
    assert_eq!(execution.progress, 100.0);
    assert!(execution.end_time.is_some());
    assert!(execution.id.starts_with("seven-stations-script-1-"));
    assert_eq!(execution.stations[0].station_name, "Initial Impressions");
    assert!(execution.failed_stations().is_empty());
    assert_eq!(gateway.calls(), 7);

    // The model sees the script content and id
    assert!(gateway.prompts()[0].contains(r#""scriptContent":"FADE IN:""#));
    assert!(gateway.prompts()[0].contains(r#""scriptId":"script-1""#));
}

#[tokio::test]
async fn test_priority_and_skip() {
    let gateway = Arc::new(MockGateway::new());
    let orchestrator = seven_stations(gateway);

    let options = SevenStationsOptions::new()
        .with_skip_stations(["deep-analysis", "screenplay-craft"])
        .with_priority_stations(["final-report", "thematic-analysis"])
        .with_execution_id("custom-id");
    let execution = orchestrator
        .run_seven_stations_pipeline("script-1", "FADE IN:", options)
        .await;

    assert_eq!(execution.id, "custom-id");
    assert_eq!(
        station_ids(&execution),
        vec![
            "thematic-analysis",
            "final-report",
            "initial-impressions",
            "character-analysis",
            "dramatic-structure",
        ]
    );
}

#[tokio::test]
async fn test_station_failure_is_partial() {
    let gateway = Arc::new(MockGateway::new().failing(AnalysisKind::Characters));
    let orchestrator = seven_stations(gateway);

    let options = SevenStationsOptions::new().with_timeout(Duration::from_secs(5));
    let execution = orchestrator
        .run_seven_stations_pipeline("script-1", "FADE IN:", options)
        .await;

    // Completed execution counts as overall success even with a failed station
    assert!(execution.overall_success);
    let failed = execution.failed_stations();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].station_id, "character-analysis");
    assert!(failed[0].result.is_none());
    assert!(failed[0].error.is_some());
}

#[tokio::test]
async fn test_skipping_everything_completes_empty() {
    let gateway = Arc::new(MockGateway::new());
    let orchestrator = seven_stations(gateway.clone());

    let all: Vec<String> = orchestrator
        .station_details()
        .iter()
        .map(|s| s.id.clone())
        .collect();
    let execution = orchestrator
        .run_seven_stations_pipeline(
            "script-1",
            "FADE IN:",
            SevenStationsOptions::new().with_skip_stations(all),
        )
        .await;

    assert!(execution.overall_success);
    assert!(execution.stations.is_empty());
    assert_eq!(execution.progress, 100.0);
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn test_lookup_cancel_and_cleanup() {
    let gateway = Arc::new(MockGateway::new().with_delay(Duration::from_millis(100)));
    let orchestrator = Arc::new(seven_stations(gateway));

    let run = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .run_seven_stations_pipeline(
                    "script-9",
                    "FADE IN:",
                    SevenStationsOptions::new().with_execution_id("run-9"),
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    let active = orchestrator.active_executions().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "run-9");
    assert!(!active[0].overall_success);

    assert!(orchestrator.cancel_execution("run-9").await);
    let execution = run.await.unwrap();
    assert!(!execution.overall_success);
    assert_eq!(execution.status, ExecutionStatus::Failed);

    let record = orchestrator.get_execution("run-9").await.unwrap();
    assert_eq!(record.status, ExecutionStatus::Failed);
    let view = orchestrator.get_seven_stations_execution("run-9").await.unwrap();
    assert_eq!(view.failure.as_deref(), Some("cancelled"));
    assert!(orchestrator.active_executions().await.is_empty());

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(orchestrator.cleanup_old_executions(0).await, 1);
    assert!(orchestrator.get_execution("run-9").await.is_none());
}
