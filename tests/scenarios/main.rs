//! Scenario-based tests for the pipeline orchestrator

#[path = "../helpers.rs"]
mod helpers;

mod cancellation;
mod caching;
mod dependency_wait;
mod failure_handling;
mod parallel;
mod progress;
mod retry_behavior;
mod seven_stations;
