//! The station catalogue

use crate::core::{AnalysisKind, StationConfig};
use serde::{Deserialize, Serialize};

/// Built-in definition of a station
#[derive(Debug, Clone, Copy)]
pub struct StationSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: AnalysisKind,
    pub capabilities: &'static [&'static str],
    pub estimated_duration_ms: u64,
}

/// The seven stations, in their default running order
pub const DEFAULT_STATIONS: [StationSpec; 7] = [
    StationSpec {
        id: "initial-impressions",
        name: "Initial Impressions",
        description: "First read of the script with a short summary and overall impressions",
        kind: AnalysisKind::Quick,
        capabilities: &["summary", "first-read"],
        estimated_duration_ms: 15_000,
    },
    StationSpec {
        id: "character-analysis",
        name: "Character Analysis",
        description: "Main characters, their traits, relationships and arcs",
        kind: AnalysisKind::Characters,
        capabilities: &["characters", "relationships", "arcs"],
        estimated_duration_ms: 30_000,
    },
    StationSpec {
        id: "thematic-analysis",
        name: "Thematic Analysis",
        description: "Main themes and recurring motifs",
        kind: AnalysisKind::Themes,
        capabilities: &["themes", "motifs"],
        estimated_duration_ms: 25_000,
    },
    StationSpec {
        id: "dramatic-structure",
        name: "Dramatic Structure",
        description: "Acts, plot points and pacing",
        kind: AnalysisKind::Structure,
        capabilities: &["structure", "plot-points", "pacing"],
        estimated_duration_ms: 30_000,
    },
    StationSpec {
        id: "screenplay-craft",
        name: "Screenplay Craft",
        description: "Writing quality, formatting and dramatic effectiveness",
        kind: AnalysisKind::Screenplay,
        capabilities: &["formatting", "dialogue", "craft"],
        estimated_duration_ms: 30_000,
    },
    StationSpec {
        id: "deep-analysis",
        name: "Deep Analysis",
        description: "Comprehensive analysis covering every aspect of the script",
        kind: AnalysisKind::Detailed,
        capabilities: &["comprehensive"],
        estimated_duration_ms: 45_000,
    },
    StationSpec {
        id: "final-report",
        name: "Final Report",
        description: "Complete report with characters, themes, structure and recommendations",
        kind: AnalysisKind::Full,
        capabilities: &["report", "recommendations"],
        estimated_duration_ms: 60_000,
    },
];

/// One analysis station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: AnalysisKind,
    pub capabilities: Vec<String>,
    pub estimated_duration_ms: u64,
}

impl From<&StationSpec> for Station {
    fn from(spec: &StationSpec) -> Self {
        Self {
            id: spec.id.to_string(),
            name: spec.name.to_string(),
            description: spec.description.to_string(),
            kind: spec.kind,
            capabilities: spec.capabilities.iter().map(|c| c.to_string()).collect(),
            estimated_duration_ms: spec.estimated_duration_ms,
        }
    }
}

impl From<&StationConfig> for Station {
    fn from(config: &StationConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            kind: config.kind,
            capabilities: config.capabilities.clone(),
            estimated_duration_ms: config.estimated_duration_ms,
        }
    }
}

/// Ordered, read-only list of stations
#[derive(Debug, Clone, PartialEq)]
pub struct StationCatalogue {
    stations: Vec<Station>,
}

impl Default for StationCatalogue {
    fn default() -> Self {
        Self {
            stations: DEFAULT_STATIONS.iter().map(Station::from).collect(),
        }
    }
}

impl StationCatalogue {
    /// Use the configured stations, or the built-in seven
    pub fn from_config(stations: Option<&[StationConfig]>) -> Self {
        match stations {
            Some(stations) => Self {
                stations: stations.iter().map(Station::from).collect(),
            },
            None => Self::default(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn all(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
