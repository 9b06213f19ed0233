//! stations - Seven Stations screenplay analysis pipeline powered by Gemini

pub mod cache;
pub mod cli;
pub mod core;
pub mod execution;
pub mod model;
pub mod persistence;
pub mod stations;

// Re-export commonly used types
pub use cache::{AnalysisCache, CachePolicy, CacheStore, InMemoryCacheStore};
pub use core::{AnalysisKind, Execution, ExecutionStatus, OrchestratorConfig, Step, StepResult};
pub use execution::{ExecutionEvent, ExecutionTracker, PipelineOrchestrator, SchedulingStrategy};
pub use model::{GeminiClient, GeminiClientConfig, GenerationConfig, ModelError, ModelGateway};
pub use stations::{SevenStationsExecution, SevenStationsOptions, SevenStationsOrchestrator};
