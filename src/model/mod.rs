//! Generative model gateway
//!
//! The orchestrator only needs "prompt in, text out". [`ModelGateway`] is
//! that seam; [`GeminiClient`] is the production implementation.

pub mod client;
pub mod error;
pub mod gemini;
pub mod generation;

use async_trait::async_trait;
pub use client::GeminiClientConfig;
pub use error::ModelError;
pub use gemini::GeminiClient;
pub use generation::{ConfigPreset, GenerationConfig};

/// Trait for model invocation - allows for different implementations
///
/// Implementations do not retry; the step executor owns retry policy.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Generate text for a prompt
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, ModelError>;
}

/// A model entry in the Gemini catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    /// Catalogue key, e.g. `gemini-1.5-flash`
    pub key: &'static str,
    pub name: &'static str,
    /// Version segment used in the API path
    pub version: &'static str,
    pub max_tokens: u32,
    pub capabilities: &'static [&'static str],
}

/// Models the client knows how to address
pub const GEMINI_MODELS: &[ModelInfo] = &[
    ModelInfo {
        key: "gemini-1.5-flash",
        name: "Gemini 1.5 Flash",
        version: "1.5-flash",
        max_tokens: 1_048_576,
        capabilities: &["text", "vision", "multimodal", "streaming"],
    },
    ModelInfo {
        key: "gemini-1.5-pro",
        name: "Gemini 1.5 Pro",
        version: "1.5-pro",
        max_tokens: 2_097_152,
        capabilities: &["text", "vision", "multimodal", "streaming", "long-context"],
    },
    ModelInfo {
        key: "gemini-pro",
        name: "Gemini Pro",
        version: "pro",
        max_tokens: 32_768,
        capabilities: &["text", "multimodal"],
    },
];

/// Look up a model by catalogue key
pub fn find_model(key: &str) -> Option<&'static ModelInfo> {
    GEMINI_MODELS.iter().find(|m| m.key == key)
}

/// Capabilities of a model, empty when unknown
pub fn model_capabilities(key: &str) -> &'static [&'static str] {
    find_model(key).map(|m| m.capabilities).unwrap_or(&[])
}
