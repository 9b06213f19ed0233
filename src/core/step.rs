//! Step domain model

use crate::model::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// The kind of analysis a step asks the model for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Characters,
    Themes,
    Structure,
    Screenplay,
    Quick,
    Detailed,
    Full,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 7] = [
        AnalysisKind::Characters,
        AnalysisKind::Themes,
        AnalysisKind::Structure,
        AnalysisKind::Screenplay,
        AnalysisKind::Quick,
        AnalysisKind::Detailed,
        AnalysisKind::Full,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Characters => "characters",
            AnalysisKind::Themes => "themes",
            AnalysisKind::Structure => "structure",
            AnalysisKind::Screenplay => "screenplay",
            AnalysisKind::Quick => "quick",
            AnalysisKind::Detailed => "detailed",
            AnalysisKind::Full => "full",
        }
    }

    /// Fixed instruction that opens every prompt of this kind
    pub fn base_prompt(&self) -> &'static str {
        match self {
            AnalysisKind::Characters => "Analyze the characters in this screenplay. Identify main characters, their traits, relationships, and character arcs.",
            AnalysisKind::Themes => "Extract and analyze the main themes and motifs in this screenplay.",
            AnalysisKind::Structure => "Analyze the dramatic structure, acts, and plot points in this screenplay.",
            AnalysisKind::Screenplay => "Review this screenplay for technical writing quality, formatting, and dramatic effectiveness.",
            AnalysisKind::Quick => "Provide a quick summary and initial impressions of this screenplay.",
            AnalysisKind::Detailed => "Provide a comprehensive analysis covering all aspects of this screenplay.",
            AnalysisKind::Full => "Perform complete analysis including characters, themes, structure, and recommendations.",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single schedulable unit of work in a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique step identifier within its pipeline
    pub id: String,

    /// Human-readable step name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Which analysis this step performs
    pub kind: AnalysisKind,

    /// Sampling settings sent to the model
    #[serde(default)]
    pub generation_config: GenerationConfig,

    /// List of step IDs this step depends on
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Per-attempt timeout (falls back to the executor default)
    #[serde(default)]
    pub timeout: Option<Duration>,

    /// Retries after the first attempt (falls back to the executor default)
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl Step {
    /// Create a step with default settings and no dependencies
    pub fn new(id: impl Into<String>, kind: AnalysisKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            kind,
            generation_config: GenerationConfig::default(),
            dependencies: Vec::new(),
            timeout: None,
            max_retries: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = config;
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Check if all dependencies have a recorded result (successful or failed)
    pub fn dependencies_met(&self, finished_steps: &HashSet<String>) -> bool {
        self.dependencies.iter().all(|dep| finished_steps.contains(dep))
    }

    /// Dependencies that have no recorded result yet
    pub fn missing_dependencies(&self, finished_steps: &HashSet<String>) -> Vec<String> {
        self.dependencies
            .iter()
            .filter(|dep| !finished_steps.contains(*dep))
            .cloned()
            .collect()
    }
}
