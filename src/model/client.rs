//! Gemini client configuration

use crate::model::ModelError;
use std::time::Duration;

/// Default Generative Language API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for [`GeminiClient`](crate::model::GeminiClient)
#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    /// API key sent with every request
    pub api_key: Option<String>,

    /// Base URL of the API (overridable for tests and proxies)
    pub base_url: String,

    /// Catalogue name of the model, e.g. `gemini-1.5-flash`
    pub model: String,

    /// HTTP timeout for a single request
    pub timeout: Duration,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the environment
    ///
    /// The key comes from `GEMINI_API_KEY`, falling back to
    /// `GOOGLE_GENAI_API_KEY`. `GEMINI_BASE_URL`, `GEMINI_MODEL` and
    /// `GEMINI_TIMEOUT_SECS` override the defaults.
    pub fn from_env() -> Result<Self, ModelError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_GENAI_API_KEY"))
            .map_err(|_| {
                ModelError::Unavailable(
                    "GEMINI_API_KEY or GOOGLE_GENAI_API_KEY must be set".to_string(),
                )
            })?;

        let mut config = Self::new().with_api_key(api_key);

        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config = config.with_model(model);
        }
        if let Some(secs) = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
