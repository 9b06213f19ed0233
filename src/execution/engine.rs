//! Pipeline orchestrator - runs a pipeline end to end

use crate::cache::{AnalysisCache, CacheStore, InMemoryCacheStore};
use crate::core::{Execution, ExecutionStatus, OrchestratorConfig, Step};
use crate::execution::{
    DependencyScheduler, ExecutionTracker, ExecutorSettings, SchedulerError, StepExecutor,
};
use crate::model::ModelGateway;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Events that can occur during pipeline execution
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: String,
        total_steps: usize,
    },
    StepStarted {
        execution_id: String,
        step_id: String,
    },
    StepCompleted {
        execution_id: String,
        step_id: String,
        success: bool,
        served_from_cache: bool,
        duration_ms: u64,
        progress: f64,
    },
    /// A step finished after its execution was already finalized
    StepDiscarded {
        execution_id: String,
        step_id: String,
    },
    PipelineFinished {
        execution_id: String,
        status: ExecutionStatus,
        progress: f64,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Fan-out of execution events to registered handlers
#[derive(Clone, Default)]
pub struct EventSink {
    handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_handler(&self, handler: EventHandler) {
        self.handlers.lock().await.push(handler);
    }

    /// Emit an event to all handlers
    pub async fn emit(&self, event: ExecutionEvent) {
        let handlers = self.handlers.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }
}

/// Largest age `chrono::Duration::hours` accepts
const MAX_AGE_HOURS: u64 = (i64::MAX / 3_600_000) as u64;

/// Runs pipelines against an injected tracker
pub struct PipelineOrchestrator {
    tracker: Arc<ExecutionTracker>,
    scheduler: DependencyScheduler,
    executor: Arc<StepExecutor>,
    events: EventSink,
}

impl PipelineOrchestrator {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        cache_store: Arc<dyn CacheStore>,
        tracker: Arc<ExecutionTracker>,
        config: &OrchestratorConfig,
    ) -> Self {
        let executor = Arc::new(StepExecutor::new(
            gateway,
            AnalysisCache::new(cache_store),
            ExecutorSettings::from(config),
        ));
        let scheduler = DependencyScheduler::new(
            config.scheduling_strategy(),
            config.max_dependency_wait(),
            tracker.clone(),
            executor.clone(),
        );

        Self {
            tracker,
            scheduler,
            executor,
            events: EventSink::new(),
        }
    }

    /// Orchestrator with an in-memory cache, a fresh tracker and default settings
    pub fn with_defaults(gateway: Arc<dyn ModelGateway>) -> Self {
        Self::new(
            gateway,
            Arc::new(InMemoryCacheStore::new()),
            Arc::new(ExecutionTracker::new()),
            &OrchestratorConfig::default(),
        )
    }

    pub fn tracker(&self) -> &Arc<ExecutionTracker> {
        &self.tracker
    }

    pub fn cache(&self) -> &AnalysisCache {
        self.executor.cache()
    }

    pub fn scheduler(&self) -> &DependencyScheduler {
        &self.scheduler
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.events.add_handler(Arc::new(handler)).await;
    }

    /// Run a pipeline to completion and return the final execution record
    ///
    /// Never fails: step errors become failed results and scheduling errors
    /// leave the execution `failed` with the cause in `failure`.
    pub async fn execute_pipeline(&self, id: &str, steps: Vec<Step>, input: Value) -> Execution {
        info!("Starting pipeline execution: {} ({} steps)", id, steps.len());

        if let Err(e) = self.tracker.create(id, steps.clone()).await {
            error!("Cannot start execution {}: {}", id, e);
            let mut rejected = Execution::new(id, steps);
            rejected.fail(e.to_string());
            return rejected;
        }

        self.events
            .emit(ExecutionEvent::PipelineStarted {
                execution_id: id.to_string(),
                total_steps: steps.len(),
            })
            .await;

        let outcome = self
            .scheduler
            .run(id, &steps, Arc::new(input), &self.events)
            .await;

        let finished = match outcome {
            Ok(()) => self.tracker.complete(id).await,
            Err(SchedulerError::Cancelled(_)) => {
                warn!("Pipeline execution {} was cancelled", id);
                self.tracker.fail(id, "cancelled").await
            }
            Err(e) => {
                error!("Pipeline execution {} failed: {}", id, e);
                self.tracker.fail(id, &e.to_string()).await
            }
        };

        let execution = match finished {
            Ok(execution) => execution,
            Err(e) => {
                // Only reachable if the record was removed mid-run
                error!("Execution {} disappeared from the tracker: {}", id, e);
                let mut lost = Execution::new(id, steps);
                lost.fail(e.to_string());
                lost
            }
        };

        info!(
            "Pipeline execution finished: {} - {} ({:.0}%)",
            id, execution.status, execution.progress
        );
        self.events
            .emit(ExecutionEvent::PipelineFinished {
                execution_id: id.to_string(),
                status: execution.status,
                progress: execution.progress,
            })
            .await;

        execution
    }

    pub async fn get_execution(&self, id: &str) -> Option<Execution> {
        self.tracker.get(id).await
    }

    pub async fn cancel_execution(&self, id: &str) -> bool {
        self.tracker.cancel(id).await
    }

    /// Drop finished executions that ended more than `max_age_hours` ago
    pub async fn cleanup_old_executions(&self, max_age_hours: u64) -> usize {
        let hours = max_age_hours.min(MAX_AGE_HOURS) as i64;
        self.tracker
            .cleanup_older_than(chrono::Duration::hours(hours))
            .await
    }
}
