//! Core domain models for the analysis pipeline
//!
//! This module defines the fundamental data structures that represent
//! steps, their results, executions and configuration.

pub mod config;
pub mod prompt;
pub mod state;
pub mod step;

pub use config::{OrchestratorConfig, StationConfig, StrategyKind};
pub use prompt::build_prompt;
pub use state::*;
pub use step::*;
