use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML overlay for the matching configuration. Every field
/// mirrors a CLI argument or a settings field; values present in the
/// file override the CLI.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub confidence_threshold: Option<u32>,
    pub similarity_threshold: Option<u32>,
    /// Duplicate method name: "artist-title", "title-only",
    /// "filename-similarity" or "duration-title".
    pub method: Option<String>,
    pub fragment_len: Option<usize>,
    pub combined_fragment_len: Option<usize>,
    pub candidate_cap: Option<usize>,
    pub early_termination: Option<bool>,
    pub early_termination_cutoff: Option<u32>,

    // Weight tables
    pub gap_weights: Option<WeightsConfig>,
    pub duplicate_weights: Option<WeightsConfig>,
    pub duration_weights: Option<DurationWeightsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct WeightsConfig {
    pub title: Option<f64>,
    pub artist: Option<f64>,
    pub combined: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DurationWeightsConfig {
    pub title: Option<f64>,
    pub duration: Option<f64>,
    pub penalty_per_second: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
