//! Dependency scheduler - runs the steps of one execution in order

use crate::core::Step;
use crate::execution::engine::{EventSink, ExecutionEvent};
use crate::execution::tracker::{ExecutionTracker, TrackerError, WaitOutcome};
use crate::execution::StepExecutor;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Strategy for scheduling step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingStrategy {
    /// Declaration order, one step at a time
    #[default]
    Sequential,

    /// Launch every step at once; each waits for its own dependencies
    Parallel,

    /// Like `Parallel`, with at most N steps talking to the model
    LimitedParallel(usize),
}

/// Reasons a run stops before every step has a result
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Dependencies not satisfied for step {step_id} after {waited_ms}ms (missing: {})", .missing.join(", "))]
    DependencyTimeout {
        step_id: String,
        missing: Vec<String>,
        waited_ms: u64,
    },

    #[error("Execution {0} was cancelled")]
    Cancelled(String),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("Step task failed: {0}")]
    Task(String),
}

/// Runs steps once their dependencies have a recorded result
///
/// Failed dependencies count as finished, so a failing step never blocks
/// its dependents.
#[derive(Clone)]
pub struct DependencyScheduler {
    strategy: SchedulingStrategy,
    max_wait: Duration,
    tracker: Arc<ExecutionTracker>,
    executor: Arc<StepExecutor>,
}

impl DependencyScheduler {
    pub fn new(
        strategy: SchedulingStrategy,
        max_wait: Duration,
        tracker: Arc<ExecutionTracker>,
        executor: Arc<StepExecutor>,
    ) -> Self {
        Self {
            strategy,
            max_wait,
            tracker,
            executor,
        }
    }

    pub fn strategy(&self) -> SchedulingStrategy {
        self.strategy
    }

    /// Run every step of an execution that the tracker already knows about
    pub async fn run(
        &self,
        execution_id: &str,
        steps: &[Step],
        input: Arc<Value>,
        events: &EventSink,
    ) -> Result<(), SchedulerError> {
        debug!(
            "Scheduling {} steps for {} ({:?})",
            steps.len(),
            execution_id,
            self.strategy
        );

        match self.strategy {
            SchedulingStrategy::Sequential => {
                self.run_sequential(execution_id, steps, input, events).await
            }
            SchedulingStrategy::Parallel => {
                self.run_concurrent(execution_id, steps, input, events, None)
                    .await
            }
            SchedulingStrategy::LimitedParallel(max) => {
                let permits = Arc::new(Semaphore::new(max.max(1)));
                self.run_concurrent(execution_id, steps, input, events, Some(permits))
                    .await
            }
        }
    }

    async fn run_sequential(
        &self,
        execution_id: &str,
        steps: &[Step],
        input: Arc<Value>,
        events: &EventSink,
    ) -> Result<(), SchedulerError> {
        for step in steps {
            if !self.tracker.is_running(execution_id).await {
                info!("Execution {} stopped before step {}", execution_id, step.id);
                return Err(SchedulerError::Cancelled(execution_id.to_string()));
            }

            self.clone()
                .run_step(
                    execution_id.to_string(),
                    step.clone(),
                    input.clone(),
                    events.clone(),
                    None,
                )
                .await?;
        }
        Ok(())
    }

    async fn run_concurrent(
        &self,
        execution_id: &str,
        steps: &[Step],
        input: Arc<Value>,
        events: &EventSink,
        permits: Option<Arc<Semaphore>>,
    ) -> Result<(), SchedulerError> {
        let mut tasks = JoinSet::new();
        for step in steps {
            tasks.spawn(self.clone().run_step(
                execution_id.to_string(),
                step.clone(),
                input.clone(),
                events.clone(),
                permits.clone(),
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(SchedulerError::Task(e.to_string())),
            };
            if let Err(e) = outcome {
                tasks.abort_all();
                return Err(e);
            }
        }
        Ok(())
    }

    async fn run_step(
        self,
        execution_id: String,
        step: Step,
        input: Arc<Value>,
        events: EventSink,
        permits: Option<Arc<Semaphore>>,
    ) -> Result<(), SchedulerError> {
        if !step.dependencies.is_empty() {
            debug!("Step {} waiting for {:?}", step.id, step.dependencies);
            match self
                .tracker
                .wait_for_dependencies(&execution_id, &step, self.max_wait)
                .await?
            {
                WaitOutcome::Satisfied => {}
                WaitOutcome::Finished => return Err(SchedulerError::Cancelled(execution_id)),
                WaitOutcome::TimedOut { missing } => {
                    warn!(
                        "Step {} gave up waiting for {:?} in {}",
                        step.id, missing, execution_id
                    );
                    return Err(SchedulerError::DependencyTimeout {
                        step_id: step.id,
                        missing,
                        waited_ms: self.max_wait.as_millis() as u64,
                    });
                }
            }
        }

        let _permit = match permits {
            Some(permits) => Some(
                permits
                    .acquire_owned()
                    .await
                    .map_err(|_| SchedulerError::Cancelled(execution_id.clone()))?,
            ),
            None => None,
        };

        if !self.tracker.is_running(&execution_id).await {
            return Err(SchedulerError::Cancelled(execution_id));
        }

        events
            .emit(ExecutionEvent::StepStarted {
                execution_id: execution_id.clone(),
                step_id: step.id.clone(),
            })
            .await;

        let result = self.executor.execute_step(&step, &input).await;
        let (success, served_from_cache, duration_ms) =
            (result.success, result.served_from_cache, result.duration_ms);

        match self.tracker.record_result(&execution_id, result).await {
            Ok(execution) => {
                events
                    .emit(ExecutionEvent::StepCompleted {
                        execution_id: execution_id.clone(),
                        step_id: step.id,
                        success,
                        served_from_cache,
                        duration_ms,
                        progress: execution.progress,
                    })
                    .await;
                Ok(())
            }
            Err(TrackerError::Finalized(_)) => {
                info!(
                    "Discarding result of step {}: execution {} already finished",
                    step.id, execution_id
                );
                events
                    .emit(ExecutionEvent::StepDiscarded {
                        execution_id: execution_id.clone(),
                        step_id: step.id,
                    })
                    .await;
                Err(SchedulerError::Cancelled(execution_id))
            }
            Err(e) => Err(e.into()),
        }
    }
}
