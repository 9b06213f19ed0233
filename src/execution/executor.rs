//! Step executor - runs individual steps against the model

use crate::cache::{analysis_cache_key, AnalysisCache, CachePolicy, Cached};
use crate::core::{build_prompt, OrchestratorConfig, Step, StepResult};
use crate::model::{ModelError, ModelGateway};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, info, warn};

/// Defaults applied to steps that do not carry their own settings
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSettings {
    pub cache_policy: CachePolicy,
    pub default_timeout: Duration,
    pub default_max_retries: u32,
    pub retry_backoff: Duration,
    pub response_language: String,
    /// Model the gateway talks to; part of every cache key
    pub model: String,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for ExecutorSettings {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            cache_policy: config.cache_policy(),
            default_timeout: config.default_step_timeout(),
            default_max_retries: config.default_max_retries,
            retry_backoff: config.retry_backoff(),
            response_language: config.response_language.clone(),
            model: config.model.clone(),
        }
    }
}

/// Executes a single step
///
/// Every outcome, including timeouts and model errors, is folded into a
/// [`StepResult`]; `execute_step` never fails.
#[derive(Clone)]
pub struct StepExecutor {
    gateway: Arc<dyn ModelGateway>,
    cache: AnalysisCache,
    settings: ExecutorSettings,
}

impl StepExecutor {
    pub fn new(gateway: Arc<dyn ModelGateway>, cache: AnalysisCache, settings: ExecutorSettings) -> Self {
        Self {
            gateway,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Execute a step and return its result
    pub async fn execute_step(&self, step: &Step, input: &Value) -> StepResult {
        info!("Executing step: {}", step.id);
        let started = Instant::now();

        let prompt = build_prompt(step.kind, input, &self.settings.response_language);
        let key = analysis_cache_key(
            &step.id,
            step.kind,
            &self.settings.model,
            &step.generation_config,
            &prompt,
        );
        debug!("Prompt for step {} ({} chars), cache key {}", step.id, prompt.len(), key);

        let attempt_timeout = step.timeout.unwrap_or(self.settings.default_timeout);
        let max_attempts = 1 + step.max_retries.unwrap_or(self.settings.default_max_retries);

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < max_attempts {
            attempts += 1;

            match self.attempt(step, &prompt, &key, attempt_timeout).await {
                Ok(cached) => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    info!(
                        "Step {} completed in {}ms (attempt {}, cached: {})",
                        step.id, duration_ms, attempts, cached.served_from_cache
                    );
                    return StepResult::success(
                        step.id.clone(),
                        cached.value,
                        duration_ms,
                        cached.served_from_cache,
                        attempts,
                    );
                }
                Err(e) => {
                    if attempts < max_attempts {
                        warn!(
                            "Step {} attempt {}/{} failed: {}",
                            step.id, attempts, max_attempts, e
                        );
                        if !self.settings.retry_backoff.is_zero() {
                            sleep(self.settings.retry_backoff).await;
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Step was not attempted".to_string());
        error!(
            "Step {} failed after {} attempt(s): {}",
            step.id, attempts, message
        );
        StepResult::failure(step.id.clone(), message, duration_ms, attempts)
    }

    async fn attempt(
        &self,
        step: &Step,
        prompt: &str,
        key: &str,
        attempt_timeout: Duration,
    ) -> Result<Cached<String>, ModelError> {
        let gateway = self.gateway.clone();
        let prompt = prompt.to_string();
        let config = step.generation_config;
        let compute = move || async move { gateway.generate(&prompt, &config).await };

        match timeout(
            attempt_timeout,
            self.cache.get_or_compute(key, &self.settings.cache_policy, compute),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(attempt_timeout.as_millis() as u64)),
        }
    }
}
