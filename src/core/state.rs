//! Execution state models

use crate::core::Step;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Execution has been created but not started
    Pending,
    /// Steps are being scheduled
    Running,
    /// Every step has a result
    Completed,
    /// Aborted by the scheduler or cancelled
    Failed,
}

impl ExecutionStatus {
    /// Check if the status is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ExecutionStatus::Pending),
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("Unknown execution status: {}", other)),
        }
    }
}

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub success: bool,

    /// Model output (present iff `success`)
    pub data: Option<String>,

    /// Error message (present iff not `success`)
    pub error: Option<String>,

    /// Wall time spent on the step, including retries
    pub duration_ms: u64,

    pub served_from_cache: bool,

    /// Number of attempts made
    pub attempts: u32,
}

impl StepResult {
    pub fn success(
        step_id: impl Into<String>,
        data: String,
        duration_ms: u64,
        served_from_cache: bool,
        attempts: u32,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            success: true,
            data: Some(data),
            error: None,
            duration_ms,
            served_from_cache,
            attempts,
        }
    }

    pub fn failure(step_id: impl Into<String>, error: String, duration_ms: u64, attempts: u32) -> Self {
        Self {
            step_id: step_id.into(),
            success: false,
            data: None,
            error: Some(error),
            duration_ms,
            served_from_cache: false,
            attempts,
        }
    }
}

/// Reasons an execution rejects a state change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Execution {0} is not running")]
    NotRunning(String),

    #[error("Step {step_id} already has a result in execution {execution_id}")]
    DuplicateResult {
        execution_id: String,
        step_id: String,
    },
}

/// One run of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub steps: Vec<Step>,

    /// Results in completion order
    pub results: IndexMap<String, StepResult>,

    pub status: ExecutionStatus,

    /// Percentage of steps with a result (0.0 to 100.0)
    pub progress: f64,

    pub start_time: DateTime<Utc>,

    /// Set once, when the execution leaves `Running`
    pub end_time: Option<DateTime<Utc>>,

    /// Why the execution failed, if it did
    pub failure: Option<String>,
}

impl Execution {
    /// Create a pending execution
    pub fn new(id: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            steps,
            results: IndexMap::new(),
            status: ExecutionStatus::Pending,
            progress: 0.0,
            start_time: Utc::now(),
            end_time: None,
            failure: None,
        }
    }

    /// Mark the execution as running
    pub fn start(&mut self) {
        if self.status == ExecutionStatus::Pending {
            self.status = ExecutionStatus::Running;
            self.start_time = Utc::now();
        }
    }

    /// Append a step result and recompute progress
    pub fn record_result(&mut self, result: StepResult) -> Result<(), StateError> {
        if self.status != ExecutionStatus::Running {
            return Err(StateError::NotRunning(self.id.clone()));
        }
        if self.results.contains_key(&result.step_id) {
            return Err(StateError::DuplicateResult {
                execution_id: self.id.clone(),
                step_id: result.step_id,
            });
        }

        self.results.insert(result.step_id.clone(), result);
        self.progress = self.calculate_progress();
        Ok(())
    }

    /// Mark the execution as completed; returns whether the status changed
    pub fn complete(&mut self) -> bool {
        if self.status != ExecutionStatus::Running {
            return false;
        }
        self.status = ExecutionStatus::Completed;
        self.end_time = Some(Utc::now());
        self.progress = if self.steps.is_empty() {
            100.0
        } else {
            self.calculate_progress()
        };
        true
    }

    /// Mark the execution as failed; returns whether the status changed
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ExecutionStatus::Failed;
        self.end_time = Some(Utc::now());
        self.failure = Some(reason.into());
        true
    }

    /// Fail a running execution on caller request
    pub fn cancel(&mut self) -> bool {
        if self.status != ExecutionStatus::Running {
            return false;
        }
        self.fail("cancelled")
    }

    /// Calculate progress percentage (0.0 to 100.0)
    pub fn calculate_progress(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        100.0 * self.results.len() as f64 / self.steps.len() as f64
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn successful_steps(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    pub fn failed_steps(&self) -> usize {
        self.results.values().filter(|r| !r.success).count()
    }

    /// Elapsed time from start to end (or to now while running)
    pub fn duration_ms(&self) -> u64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        end.signed_duration_since(self.start_time)
            .num_milliseconds()
            .max(0) as u64
    }
}
