//! Pipeline execution: step executor, dependency scheduler, tracker and orchestrator

pub mod engine;
pub mod executor;
pub mod scheduler;
pub mod tracker;

pub use engine::{EventHandler, EventSink, ExecutionEvent, PipelineOrchestrator};
pub use executor::{ExecutorSettings, StepExecutor};
pub use scheduler::{DependencyScheduler, SchedulerError, SchedulingStrategy};
pub use tracker::{ExecutionTracker, StepCompletions, TrackerError, WaitOutcome};
