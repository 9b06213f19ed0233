//! Execution history
//!
//! Finished executions are summarised and stored so the CLI can show
//! past runs. The tracker itself stays in memory.

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteExecutionStore;

use crate::core::{Execution, ExecutionStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Summary of a pipeline execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub execution_id: String,

    /// Pipeline the execution belongs to, e.g. `seven-stations`
    pub pipeline_name: String,

    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Progress (0.0 to 100.0)
    pub progress: f64,

    pub completed_steps: usize,
    pub failed_steps: usize,
    pub total_steps: usize,

    pub failure: Option<String>,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save (or replace) an execution summary
    async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()>;

    /// Load an execution by ID
    async fn load_execution(&self, execution_id: &str) -> Result<Option<ExecutionSummary>>;

    /// List all executions for a pipeline, oldest first
    async fn list_executions(&self, pipeline_name: &str) -> Result<Vec<ExecutionSummary>>;

    /// List all pipeline names
    async fn list_pipelines(&self) -> Result<Vec<String>>;

    /// Most recently started executions, newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<ExecutionSummary>>;
}

/// In-memory persistence (for testing or ephemeral use)
#[derive(Default)]
pub struct InMemoryPersistence {
    executions: RwLock<HashMap<String, ExecutionSummary>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()> {
        self.executions
            .write()
            .await
            .insert(execution.execution_id.clone(), execution.clone());
        Ok(())
    }

    async fn load_execution(&self, execution_id: &str) -> Result<Option<ExecutionSummary>> {
        Ok(self.executions.read().await.get(execution_id).cloned())
    }

    async fn list_executions(&self, pipeline_name: &str) -> Result<Vec<ExecutionSummary>> {
        let mut result: Vec<ExecutionSummary> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.pipeline_name == pipeline_name)
            .cloned()
            .collect();
        result.sort_by_key(|e| e.started_at);
        Ok(result)
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .executions
            .read()
            .await
            .values()
            .map(|e| e.pipeline_name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ExecutionSummary>> {
        let mut result: Vec<ExecutionSummary> =
            self.executions.read().await.values().cloned().collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        result.truncate(limit);
        Ok(result)
    }
}

/// Create a summary from an execution
pub fn create_summary(execution: &Execution, pipeline_name: &str) -> ExecutionSummary {
    ExecutionSummary {
        execution_id: execution.id.clone(),
        pipeline_name: pipeline_name.to_string(),
        status: execution.status,
        started_at: execution.start_time,
        completed_at: execution.end_time,
        progress: execution.progress,
        completed_steps: execution.successful_steps(),
        failed_steps: execution.failed_steps(),
        total_steps: execution.steps.len(),
        failure: execution.failure.clone(),
    }
}
