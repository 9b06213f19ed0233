//! Seven Stations screenplay analysis
//!
//! Maps the station catalogue onto pipeline steps and reports results per
//! station. Scheduling, caching and retries are delegated to
//! [`PipelineOrchestrator`].

pub mod catalogue;

pub use catalogue::{Station, StationCatalogue, StationSpec, DEFAULT_STATIONS};

use crate::core::{Execution, ExecutionStatus, OrchestratorConfig, Step};
use crate::execution::{ExecutionEvent, PipelineOrchestrator};
use crate::model::{ConfigPreset, GenerationConfig, ModelGateway};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Per-run overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SevenStationsOptions {
    /// Stations left out of the run (`None` uses the configured list)
    pub skip_stations: Option<Vec<String>>,

    /// Stations moved to the front, keeping their relative order
    pub priority_stations: Option<Vec<String>>,

    /// Per-attempt timeout applied to every station
    pub timeout: Option<Duration>,

    /// Explicit execution id instead of a generated one
    pub execution_id: Option<String>,
}

impl SevenStationsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_stations<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_stations = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_priority_stations<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority_stations = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_execution_id(mut self, id: impl Into<String>) -> Self {
        self.execution_id = Some(id.into());
        self
    }
}

/// Outcome of one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationResult {
    pub station_id: String,
    pub station_name: String,
    pub result: Option<String>,
    pub error: Option<String>,
    pub success: bool,
    pub duration_ms: u64,
    pub served_from_cache: bool,
}

/// Station-level view of an execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SevenStationsExecution {
    pub id: String,

    /// Results in completion order
    pub stations: Vec<StationResult>,

    /// Whether the underlying execution completed; individual stations may still have failed
    pub overall_success: bool,

    pub status: ExecutionStatus,
    pub total_duration_ms: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub progress: f64,
    pub failure: Option<String>,
}

impl SevenStationsExecution {
    /// Build the station view, naming results from the catalogue
    pub fn from_execution(execution: &Execution, catalogue: &StationCatalogue) -> Self {
        let stations = execution
            .results
            .values()
            .map(|result| {
                let station_name = catalogue
                    .get(&result.step_id)
                    .map(|s| s.name.clone())
                    .or_else(|| {
                        execution
                            .steps
                            .iter()
                            .find(|s| s.id == result.step_id)
                            .map(|s| s.name.clone())
                    })
                    .unwrap_or_else(|| result.step_id.clone());

                StationResult {
                    station_id: result.step_id.clone(),
                    station_name,
                    result: result.data.clone(),
                    error: result.error.clone(),
                    success: result.success,
                    duration_ms: result.duration_ms,
                    served_from_cache: result.served_from_cache,
                }
            })
            .collect();

        Self {
            id: execution.id.clone(),
            stations,
            overall_success: execution.status == ExecutionStatus::Completed,
            status: execution.status,
            total_duration_ms: execution.duration_ms(),
            start_time: execution.start_time,
            end_time: execution.end_time,
            progress: execution.progress,
            failure: execution.failure.clone(),
        }
    }

    /// Stations whose analysis failed
    pub fn failed_stations(&self) -> Vec<&StationResult> {
        self.stations.iter().filter(|s| !s.success).collect()
    }
}

/// Runs the Seven Stations analysis of a script
pub struct SevenStationsOrchestrator {
    pipeline: PipelineOrchestrator,
    catalogue: StationCatalogue,
    station_timeout: Duration,
    station_retries: u32,
    skip_stations: Vec<String>,
    priority_stations: Vec<String>,
}

impl SevenStationsOrchestrator {
    pub fn new(pipeline: PipelineOrchestrator, config: &OrchestratorConfig) -> Self {
        Self {
            pipeline,
            catalogue: StationCatalogue::from_config(config.stations.as_deref()),
            station_timeout: config.default_step_timeout(),
            station_retries: config.default_max_retries,
            skip_stations: config.skip_stations.clone(),
            priority_stations: config.priority_stations.clone(),
        }
    }

    /// Orchestrator over the default pipeline settings and the built-in stations
    pub fn with_defaults(gateway: Arc<dyn ModelGateway>) -> Self {
        Self::new(
            PipelineOrchestrator::with_defaults(gateway),
            &OrchestratorConfig::default(),
        )
    }

    pub fn pipeline(&self) -> &PipelineOrchestrator {
        &self.pipeline
    }

    pub fn catalogue(&self) -> &StationCatalogue {
        &self.catalogue
    }

    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.pipeline.add_event_handler(handler).await;
    }

    /// Turn the catalogue into the ordered steps of one run
    ///
    /// Skipped stations are dropped, then priority stations move to the
    /// front. Both groups keep catalogue order.
    pub fn plan_steps(&self, options: &SevenStationsOptions) -> Vec<Step> {
        let skip: HashSet<&str> = options
            .skip_stations
            .as_ref()
            .unwrap_or(&self.skip_stations)
            .iter()
            .map(String::as_str)
            .collect();
        let priority: HashSet<&str> = options
            .priority_stations
            .as_ref()
            .unwrap_or(&self.priority_stations)
            .iter()
            .map(String::as_str)
            .collect();

        let (first, rest): (Vec<&Station>, Vec<&Station>) = self
            .catalogue
            .all()
            .iter()
            .filter(|s| !skip.contains(s.id.as_str()))
            .partition(|s| priority.contains(s.id.as_str()));

        let timeout = options.timeout.unwrap_or(self.station_timeout);
        first
            .into_iter()
            .chain(rest)
            .map(|station| {
                Step::new(station.id.clone(), station.kind)
                    .with_name(station.name.clone())
                    .with_description(station.description.clone())
                    .with_generation_config(GenerationConfig::preset(ConfigPreset::Analysis))
                    .with_timeout(timeout)
                    .with_max_retries(self.station_retries)
            })
            .collect()
    }

    /// Analyse a script through every selected station
    pub async fn run_seven_stations_pipeline(
        &self,
        script_id: &str,
        script_content: &str,
        options: SevenStationsOptions,
    ) -> SevenStationsExecution {
        let execution_id = options
            .execution_id
            .clone()
            .unwrap_or_else(|| generate_execution_id(script_id));
        let steps = self.plan_steps(&options);

        info!(
            "Running {} stations for script {} as {}",
            steps.len(),
            script_id,
            execution_id
        );

        let input = json!({
            "scriptContent": script_content,
            "scriptId": script_id,
        });
        let execution = self
            .pipeline
            .execute_pipeline(&execution_id, steps, input)
            .await;

        SevenStationsExecution::from_execution(&execution, &self.catalogue)
    }

    pub async fn get_execution(&self, id: &str) -> Option<Execution> {
        self.pipeline.get_execution(id).await
    }

    pub async fn get_seven_stations_execution(&self, id: &str) -> Option<SevenStationsExecution> {
        self.pipeline
            .get_execution(id)
            .await
            .map(|execution| SevenStationsExecution::from_execution(&execution, &self.catalogue))
    }

    pub async fn cancel_execution(&self, id: &str) -> bool {
        self.pipeline.cancel_execution(id).await
    }

    pub async fn cleanup_old_executions(&self, max_age_hours: u64) -> usize {
        self.pipeline.cleanup_old_executions(max_age_hours).await
    }

    pub fn station_details(&self) -> &[Station] {
        self.catalogue.all()
    }

    /// Executions that are still running
    pub async fn active_executions(&self) -> Vec<SevenStationsExecution> {
        let mut active = Vec::new();
        for id in self.pipeline.tracker().active_ids().await {
            if let Some(execution) = self.get_seven_stations_execution(&id).await {
                active.push(execution);
            }
        }
        active
    }
}

/// `seven-stations-{script}-{epoch millis}-{short uuid}`
pub fn generate_execution_id(script_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "seven-stations-{}-{}-{}",
        script_id,
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}
