//! Test: Caching - repeated analyses are served from the cache

use crate::helpers::*;
use serde_json::json;
use stations::cache::{CacheEntry, CacheStore, InMemoryCacheStore};
use stations::core::{AnalysisKind, OrchestratorConfig};
use stations::execution::{ExecutionTracker, PipelineOrchestrator};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let gateway = Arc::new(MockGateway::new());
    let orchestrator = orchestrator(gateway.clone(), &OrchestratorConfig::default());

    let first = orchestrator
        .execute_pipeline("first", vec![step("A", AnalysisKind::Characters)], script_input())
        .await;
    let second = orchestrator
        .execute_pipeline("second", vec![step("A", AnalysisKind::Characters)], script_input())
        .await;

    assert!(!first.results["A"].served_from_cache);
    assert!(second.results["A"].served_from_cache);
    assert_eq!(first.results["A"].data, second.results["A"].data);
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn test_different_input_misses_cache() {
    let gateway = Arc::new(MockGateway::new());
    let orchestrator = orchestrator(gateway.clone(), &OrchestratorConfig::default());

    orchestrator
        .execute_pipeline("first", vec![step("A", AnalysisKind::Characters)], script_input())
        .await;
    let other = orchestrator
        .execute_pipeline(
            "second",
            vec![step("A", AnalysisKind::Characters)],
            json!({"scriptId": "script-2", "scriptContent": "EXT. BEACH - DAY"}),
        )
        .await;

    assert!(!other.results["A"].served_from_cache);
    assert_eq!(gateway.calls(), 2);
}

fn shared_store_orchestrator(
    gateway: Arc<MockGateway>,
    store: Arc<InMemoryCacheStore>,
    config: &OrchestratorConfig,
) -> PipelineOrchestrator {
    PipelineOrchestrator::new(gateway, store, Arc::new(ExecutionTracker::new()), config)
}

#[tokio::test]
async fn test_response_language_separates_shared_cache_entries() {
    let store = Arc::new(InMemoryCacheStore::new());
    let arabic_gateway = Arc::new(MockGateway::new());
    let english_gateway = Arc::new(MockGateway::new());
    let arabic = shared_store_orchestrator(
        arabic_gateway.clone(),
        store.clone(),
        &OrchestratorConfig::default(),
    );
    let english = shared_store_orchestrator(
        english_gateway.clone(),
        store.clone(),
        &OrchestratorConfig {
            response_language: "English".to_string(),
            ..OrchestratorConfig::default()
        },
    );

    arabic
        .execute_pipeline("arabic", vec![step("A", AnalysisKind::Themes)], script_input())
        .await;
    let english_run = english
        .execute_pipeline("english", vec![step("A", AnalysisKind::Themes)], script_input())
        .await;

    assert_step_succeeded(&english_run, "A");
    assert!(!english_run.results["A"].served_from_cache);
    assert_eq!(arabic_gateway.calls(), 1);
    assert_eq!(english_gateway.calls(), 1);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_model_separates_shared_cache_entries() {
    let store = Arc::new(InMemoryCacheStore::new());
    let flash_gateway = Arc::new(MockGateway::new());
    let pro_gateway = Arc::new(MockGateway::new());
    let flash = shared_store_orchestrator(
        flash_gateway.clone(),
        store.clone(),
        &OrchestratorConfig::default(),
    );
    let pro = shared_store_orchestrator(
        pro_gateway.clone(),
        store.clone(),
        &OrchestratorConfig {
            model: "gemini-1.5-pro".to_string(),
            ..OrchestratorConfig::default()
        },
    );

    flash
        .execute_pipeline("flash", vec![step("A", AnalysisKind::Themes)], script_input())
        .await;
    let pro_run = pro
        .execute_pipeline("pro", vec![step("A", AnalysisKind::Themes)], script_input())
        .await;

    assert!(!pro_run.results["A"].served_from_cache);
    assert_eq!(pro_gateway.calls(), 1);

    // Same configuration still shares the entry
    let flash_again = shared_store_orchestrator(
        Arc::new(MockGateway::new()),
        store.clone(),
        &OrchestratorConfig::default(),
    );
    let repeat = flash_again
        .execute_pipeline("flash-again", vec![step("A", AnalysisKind::Themes)], script_input())
        .await;
    assert!(repeat.results["A"].served_from_cache);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let gateway = Arc::new(MockGateway::new().failing_first(1));
    let orchestrator = orchestrator(gateway.clone(), &OrchestratorConfig::default());

    let failed = orchestrator
        .execute_pipeline("first", vec![step("A", AnalysisKind::Quick)], script_input())
        .await;
    let recovered = orchestrator
        .execute_pipeline("second", vec![step("A", AnalysisKind::Quick)], script_input())
        .await;

    assert_step_failed(&failed, "A");
    assert_step_succeeded(&recovered, "A");
    assert!(!recovered.results["A"].served_from_cache);
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn test_stale_entry_is_served_and_refreshed() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(InMemoryCacheStore::new());
    let config = OrchestratorConfig {
        cache_ttl_secs: 0,
        ..OrchestratorConfig::default()
    };
    let orchestrator = PipelineOrchestrator::new(
        gateway.clone(),
        store.clone(),
        Arc::new(ExecutionTracker::new()),
        &config,
    );

    orchestrator
        .execute_pipeline("warm", vec![step("A", AnalysisKind::Themes)], script_input())
        .await;
    assert_eq!(gateway.calls(), 1);

    // With a zero TTL the entry is immediately stale but inside the stale window
    let stale = orchestrator
        .execute_pipeline("stale", vec![step("A", AnalysisKind::Themes)], script_input())
        .await;
    assert!(stale.results["A"].served_from_cache);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(gateway.calls(), 2, "background refresh should have called the model");
}

#[tokio::test]
async fn test_invalidation_forces_recompute() {
    let gateway = Arc::new(MockGateway::new());
    let orchestrator = orchestrator(gateway.clone(), &OrchestratorConfig::default());

    orchestrator
        .execute_pipeline("first", vec![step("A", AnalysisKind::Structure)], script_input())
        .await;
    assert_eq!(orchestrator.cache().invalidate("gemini:analysis:*").await, 1);

    let second = orchestrator
        .execute_pipeline("second", vec![step("A", AnalysisKind::Structure)], script_input())
        .await;
    assert!(!second.results["A"].served_from_cache);
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn test_store_is_shared_boundary() {
    let store = InMemoryCacheStore::new();
    let entry = CacheEntry::new(json!("value"), Duration::from_secs(60), Duration::ZERO);
    store.set("gemini:analysis:abc", entry).await.unwrap();

    assert!(store.get("gemini:analysis:abc").await.unwrap().is_some());
    assert_eq!(store.invalidate("gemini:*").await.unwrap(), 1);
    assert!(store.get("gemini:analysis:abc").await.unwrap().is_none());
}
