//! Gemini `generateContent` client

use crate::model::{find_model, GeminiClientConfig, GenerationConfig, ModelError, ModelGateway};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Client for the Gemini generative language API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model_version: &'static str,
    timeout_ms: u64,
}

impl GeminiClient {
    /// Create a new client
    ///
    /// # Errors
    /// Returns `ModelError::Unavailable` if no API key is configured, the model
    /// is not in the catalogue, or the HTTP client cannot be built.
    pub fn new(config: GeminiClientConfig) -> Result<Self, ModelError> {
        let api_key = config
            .api_key
            .ok_or_else(|| ModelError::Unavailable("Gemini API key not configured".to_string()))?;

        let model = find_model(&config.model)
            .ok_or_else(|| ModelError::Unavailable(format!("Unknown model: {}", config.model)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key_value = HeaderValue::from_str(&api_key)
            .map_err(|_| ModelError::Unavailable("Invalid API key format".to_string()))?;
        headers.insert("x-goog-api-key", key_value);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ModelError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url,
            model_version: model.version,
            timeout_ms: config.timeout.as_millis() as u64,
        })
    }

    /// Create a client from environment variables
    pub fn from_env() -> Result<Self, ModelError> {
        Self::new(GeminiClientConfig::from_env()?)
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/gemini-{}:generateContent",
            self.base_url, self.model_version
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
    status: Option<String>,
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, ModelError> {
        debug!("Sending prompt of {} bytes to {}", prompt.len(), self.generate_url());

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: config,
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.timeout_ms)
                } else {
                    ModelError::RequestFailed(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(self.timeout_ms)
            } else {
                ModelError::RequestFailed(format!("Failed to read response body: {}", e))
            }
        })?;

        let parsed: Option<GenerateResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let detail = parsed
                .and_then(|r| r.error)
                .map(|e| {
                    format!(
                        "{}: {}",
                        e.status.unwrap_or_else(|| "ERROR".to_string()),
                        e.message.unwrap_or_default()
                    )
                })
                .unwrap_or_else(|| body.trim().to_string());
            warn!("Gemini returned HTTP {}: {}", status.as_u16(), detail);
            return Err(ModelError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let parsed = parsed.ok_or_else(|| {
            ModelError::RequestFailed("Failed to decode Gemini response".to_string())
        })?;

        if let Some(error) = parsed.error {
            return Err(ModelError::RequestFailed(
                error.message.unwrap_or_else(|| "Unknown Gemini error".to_string()),
            ));
        }

        let text: String = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ModelError::RequestFailed(
                "Gemini response contained no text".to_string(),
            ));
        }

        debug!("Gemini returned {} bytes", text.len());
        Ok(text)
    }
}
