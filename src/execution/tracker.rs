//! Registry of pipeline executions
//!
//! Each execution sits behind its own mutex so updates to one id never
//! block another; the registry lock is only held to look an id up.

use crate::core::{Execution, ExecutionStatus, StateError, Step, StepResult};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info};

/// Errors raised by the tracker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("Execution not found: {0}")]
    NotFound(String),

    #[error("Execution already exists: {0}")]
    AlreadyExists(String),

    #[error("Execution {0} is already finished")]
    Finalized(String),

    #[error("Step {step_id} already has a result in execution {execution_id}")]
    DuplicateResult {
        execution_id: String,
        step_id: String,
    },
}

impl From<StateError> for TrackerError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotRunning(id) => TrackerError::Finalized(id),
            StateError::DuplicateResult {
                execution_id,
                step_id,
            } => TrackerError::DuplicateResult {
                execution_id,
                step_id,
            },
        }
    }
}

/// Snapshot broadcast to dependency waiters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepCompletions {
    /// Steps with a recorded result
    pub completed: HashSet<String>,

    /// Set once the execution leaves `Running`
    pub finished: bool,
}

/// How a dependency wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied,
    TimedOut { missing: Vec<String> },
    Finished,
}

struct TrackedExecution {
    execution: Mutex<Execution>,
    completions: watch::Sender<StepCompletions>,
}

/// Shared registry of executions keyed by id
#[derive(Default)]
pub struct ExecutionTracker {
    executions: RwLock<HashMap<String, Arc<TrackedExecution>>>,
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: &str) -> Result<Arc<TrackedExecution>, TrackerError> {
        self.executions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    /// Register a new execution and move it straight to `Running`
    ///
    /// An id is only reusable once its previous execution has finished.
    pub async fn create(&self, id: &str, steps: Vec<Step>) -> Result<Execution, TrackerError> {
        let mut executions = self.executions.write().await;

        if let Some(existing) = executions.get(id) {
            if !existing.execution.lock().await.is_terminal() {
                return Err(TrackerError::AlreadyExists(id.to_string()));
            }
        }

        let mut execution = Execution::new(id, steps);
        execution.start();
        let snapshot = execution.clone();

        let (completions, _) = watch::channel(StepCompletions::default());
        executions.insert(
            id.to_string(),
            Arc::new(TrackedExecution {
                execution: Mutex::new(execution),
                completions,
            }),
        );

        info!("Created execution {} ({} steps)", id, snapshot.steps.len());
        Ok(snapshot)
    }

    /// Append a step result and return the updated execution
    pub async fn record_result(
        &self,
        id: &str,
        result: StepResult,
    ) -> Result<Execution, TrackerError> {
        let tracked = self.entry(id).await?;
        let mut execution = tracked.execution.lock().await;

        let step_id = result.step_id.clone();
        execution.record_result(result)?;
        debug!(
            "Recorded result for step {} in {} ({:.1}%)",
            step_id, id, execution.progress
        );

        tracked.completions.send_modify(|state| {
            state.completed.insert(step_id);
        });
        Ok(execution.clone())
    }

    /// Mark an execution completed; no-op if it is already finished
    pub async fn complete(&self, id: &str) -> Result<Execution, TrackerError> {
        self.finish(id, |execution| execution.complete()).await
    }

    /// Mark an execution failed; no-op if it is already finished
    pub async fn fail(&self, id: &str, reason: &str) -> Result<Execution, TrackerError> {
        self.finish(id, |execution| execution.fail(reason)).await
    }

    /// Cancel a running execution
    ///
    /// Returns false for unknown ids and executions that already finished.
    /// In-flight work is not interrupted; its results are rejected.
    pub async fn cancel(&self, id: &str) -> bool {
        match self.finish_with(id, |execution| execution.cancel()).await {
            Ok((_, changed)) => {
                if changed {
                    info!("Cancelled execution {}", id);
                }
                changed
            }
            Err(_) => false,
        }
    }

    async fn finish<F>(&self, id: &str, transition: F) -> Result<Execution, TrackerError>
    where
        F: FnOnce(&mut Execution) -> bool,
    {
        self.finish_with(id, transition)
            .await
            .map(|(execution, _)| execution)
    }

    async fn finish_with<F>(
        &self,
        id: &str,
        transition: F,
    ) -> Result<(Execution, bool), TrackerError>
    where
        F: FnOnce(&mut Execution) -> bool,
    {
        let tracked = self.entry(id).await?;
        let mut execution = tracked.execution.lock().await;
        let changed = transition(&mut execution);
        if changed {
            tracked.completions.send_modify(|state| state.finished = true);
        }
        Ok((execution.clone(), changed))
    }

    /// Snapshot of an execution
    pub async fn get(&self, id: &str) -> Option<Execution> {
        let tracked = self.entry(id).await.ok()?;
        let execution = tracked.execution.lock().await;
        Some(execution.clone())
    }

    pub async fn status(&self, id: &str) -> Option<ExecutionStatus> {
        let tracked = self.entry(id).await.ok()?;
        let status = tracked.execution.lock().await.status;
        Some(status)
    }

    pub async fn is_running(&self, id: &str) -> bool {
        self.status(id).await == Some(ExecutionStatus::Running)
    }

    /// Subscribe to step completions of an execution
    pub async fn subscribe(&self, id: &str) -> Option<watch::Receiver<StepCompletions>> {
        let tracked = self.entry(id).await.ok()?;
        Some(tracked.completions.subscribe())
    }

    /// Wait until every dependency of `step` has a recorded result
    ///
    /// Returns early with [`WaitOutcome::Finished`] when the execution stops
    /// running, and with [`WaitOutcome::TimedOut`] after `max_wait`.
    pub async fn wait_for_dependencies(
        &self,
        id: &str,
        step: &Step,
        max_wait: Duration,
    ) -> Result<WaitOutcome, TrackerError> {
        let mut rx = self
            .subscribe(id)
            .await
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        let closed = matches!(
            tokio::time::timeout(
                max_wait,
                rx.wait_for(|state| state.finished || step.dependencies_met(&state.completed)),
            )
            .await,
            Ok(Err(_))
        );

        let state = rx.borrow().clone();
        if step.dependencies_met(&state.completed) {
            return Ok(WaitOutcome::Satisfied);
        }
        if state.finished || closed {
            return Ok(WaitOutcome::Finished);
        }

        Ok(WaitOutcome::TimedOut {
            missing: step.missing_dependencies(&state.completed),
        })
    }

    /// Ids of executions that are still running
    pub async fn active_ids(&self) -> Vec<String> {
        let entries: Vec<(String, Arc<TrackedExecution>)> = self
            .executions
            .read()
            .await
            .iter()
            .map(|(id, tracked)| (id.clone(), tracked.clone()))
            .collect();

        let mut active = Vec::new();
        for (id, tracked) in entries {
            if tracked.execution.lock().await.status == ExecutionStatus::Running {
                active.push(id);
            }
        }
        active.sort();
        active
    }

    /// Number of tracked executions, finished or not
    pub async fn len(&self) -> usize {
        self.executions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.executions.read().await.is_empty()
    }

    /// Remove finished executions whose end time is older than `max_age`
    pub async fn cleanup_older_than(&self, max_age: chrono::Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return 0;
        };
        let mut executions = self.executions.write().await;

        let mut expired = Vec::new();
        for (id, tracked) in executions.iter() {
            let execution = tracked.execution.lock().await;
            if matches!(execution.end_time, Some(end) if end < cutoff) {
                expired.push(id.clone());
            }
        }

        for id in &expired {
            executions.remove(id);
        }

        if !expired.is_empty() {
            info!("Removed {} finished executions", expired.len());
        }
        expired.len()
    }

    #[cfg(test)]
    async fn backdate(&self, id: &str, by: chrono::Duration) {
        if let Ok(tracked) = self.entry(id).await {
            let mut execution = tracked.execution.lock().await;
            execution.end_time = execution.end_time.map(|end| end - by);
        }
    }
}
