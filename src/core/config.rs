//! Orchestrator configuration from YAML

use crate::cache::CachePolicy;
use crate::core::AnalysisKind;
use crate::execution::SchedulingStrategy;
use crate::model::find_model;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// How steps of one execution are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    Sequential,
    Parallel,
    ParallelLimited,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(StrategyKind::Sequential),
            "parallel" => Ok(StrategyKind::Parallel),
            "parallel-limited" => Ok(StrategyKind::ParallelLimited),
            other => anyhow::bail!(
                "Unknown strategy '{}' (expected sequential, parallel or parallel-limited)",
                other
            ),
        }
    }
}

/// A station entry as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub kind: AnalysisKind,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default = "default_estimated_duration_ms")]
    pub estimated_duration_ms: u64,
}

/// Top-level configuration loaded from YAML
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Seconds a cached analysis is served as fresh
    pub cache_ttl_secs: u64,

    /// Seconds after expiry a cached analysis may still be served
    pub stale_ttl_secs: u64,

    pub stale_while_revalidate: bool,

    /// Upper bound on how long a step waits for its dependencies
    pub max_dependency_wait_ms: u64,

    /// Per-attempt timeout for steps without their own
    pub default_step_timeout_ms: u64,

    /// Retries after the first attempt for steps without their own
    pub default_max_retries: u32,

    /// Fixed delay between attempts
    pub retry_backoff_ms: u64,

    /// Language the model is asked to answer in
    pub response_language: String,

    /// Catalogue name of the Gemini model
    pub model: String,

    pub strategy: StrategyKind,

    /// Concurrency bound for `parallel-limited`
    pub max_parallel: usize,

    /// Stations skipped unless the caller says otherwise
    pub skip_stations: Vec<String>,

    /// Stations moved to the front unless the caller says otherwise
    pub priority_stations: Vec<String>,

    /// Replaces the built-in station catalogue
    pub stations: Option<Vec<StationConfig>>,
}

fn default_estimated_duration_ms() -> u64 {
    30_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 1800,
            stale_ttl_secs: 3600,
            stale_while_revalidate: true,
            max_dependency_wait_ms: 30_000,
            default_step_timeout_ms: 60_000,
            default_max_retries: 2,
            retry_backoff_ms: 0,
            response_language: "Arabic".to_string(),
            model: "gemini-1.5-flash".to_string(),
            strategy: StrategyKind::Sequential,
            max_parallel: 4,
            skip_stations: Vec::new(),
            priority_stations: Vec::new(),
            stations: None,
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: OrchestratorConfig = if yaml.trim().is_empty() {
            OrchestratorConfig::default()
        } else {
            serde_yaml::from_str(yaml).context("Invalid configuration YAML")?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if find_model(&self.model).is_none() {
            anyhow::bail!("Unknown model: {}", self.model);
        }

        if self.strategy == StrategyKind::ParallelLimited && self.max_parallel == 0 {
            anyhow::bail!("max_parallel must be at least 1 for the parallel-limited strategy");
        }

        if self.response_language.trim().is_empty() {
            anyhow::bail!("response_language must not be empty");
        }

        let station_ids: HashSet<&str> = match &self.stations {
            Some(stations) => {
                if stations.is_empty() {
                    anyhow::bail!("Station list must not be empty when given");
                }
                let mut seen = HashSet::new();
                for station in stations {
                    if station.id.trim().is_empty() {
                        anyhow::bail!("Station '{}' has an empty id", station.name);
                    }
                    if !seen.insert(station.id.as_str()) {
                        anyhow::bail!("Duplicate station ID: {}", station.id);
                    }
                }
                seen
            }
            None => crate::stations::DEFAULT_STATIONS
                .iter()
                .map(|s| s.id)
                .collect(),
        };

        for (field, ids) in [
            ("skip_stations", &self.skip_stations),
            ("priority_stations", &self.priority_stations),
        ] {
            for id in ids {
                if !station_ids.contains(id.as_str()) {
                    anyhow::bail!("{} references unknown station '{}'", field, id);
                }
            }
        }

        Ok(())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            stale_while_revalidate: self.stale_while_revalidate,
            stale_ttl: Duration::from_secs(self.stale_ttl_secs),
        }
    }

    pub fn scheduling_strategy(&self) -> SchedulingStrategy {
        match self.strategy {
            StrategyKind::Sequential => SchedulingStrategy::Sequential,
            StrategyKind::Parallel => SchedulingStrategy::Parallel,
            StrategyKind::ParallelLimited => SchedulingStrategy::LimitedParallel(self.max_parallel),
        }
    }

    pub fn max_dependency_wait(&self) -> Duration {
        Duration::from_millis(self.max_dependency_wait_ms)
    }

    pub fn default_step_timeout(&self) -> Duration {
        Duration::from_millis(self.default_step_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
