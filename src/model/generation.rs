//! Generation settings sent with every model call

use serde::{Deserialize, Serialize};

/// Sampling configuration for a generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

/// Named generation presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigPreset {
    Analysis,
    Creative,
    Chat,
    Summary,
}

impl GenerationConfig {
    /// Build the configuration for a named preset
    pub fn preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Analysis => Self {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 2048,
            },
            ConfigPreset::Creative => Self {
                temperature: 0.9,
                top_k: 50,
                top_p: 0.98,
                max_output_tokens: 1024,
            },
            ConfigPreset::Chat => Self {
                temperature: 0.8,
                top_k: 40,
                top_p: 0.9,
                max_output_tokens: 512,
            },
            ConfigPreset::Summary => Self {
                temperature: 0.3,
                top_k: 20,
                top_p: 0.8,
                max_output_tokens: 256,
            },
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::preset(ConfigPreset::Analysis)
    }
}
