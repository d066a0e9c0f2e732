mod file_config;

pub use file_config::{DurationWeightsConfig, FileConfig, WeightsConfig};

use crate::error::MatchError;
use crate::matching::{
    DuplicateMethod, DuplicateSettings, DuplicateWeights, DurationWeights, GapSettings,
    GapWeights, IndexSettings,
};
use clap::ValueEnum;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub confidence_threshold: u32,
    pub similarity_threshold: u32,
    pub method: DuplicateMethod,
    pub fragment_len: usize,
    pub combined_fragment_len: usize,
    pub candidate_cap: usize,
    pub early_termination_cutoff: u32,
    /// Disable the early-termination short-circuit for exhaustive scans.
    pub exhaustive: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        let gap = GapSettings::default();
        let duplicates = DuplicateSettings::default();
        Self {
            confidence_threshold: gap.confidence_threshold,
            similarity_threshold: duplicates.similarity_threshold,
            method: duplicates.method,
            fragment_len: gap.index.fragment_len,
            combined_fragment_len: gap.index.combined_fragment_len,
            candidate_cap: gap.index.candidate_cap,
            early_termination_cutoff: gap.early_termination_cutoff,
            exhaustive: false,
        }
    }
}

/// Fully resolved configuration for both engines.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gap: GapSettings,
    pub duplicates: DuplicateSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present. The resolved
    /// settings are validated before being returned.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self, MatchError> {
        let file = file_config.unwrap_or_default();

        let index = IndexSettings {
            fragment_len: file.fragment_len.unwrap_or(cli.fragment_len),
            combined_fragment_len: file
                .combined_fragment_len
                .unwrap_or(cli.combined_fragment_len),
            candidate_cap: file.candidate_cap.unwrap_or(cli.candidate_cap),
        };

        let gap_defaults = GapWeights::default();
        let gap_file = file.gap_weights.clone().unwrap_or_default();
        let gap = GapSettings {
            confidence_threshold: file
                .confidence_threshold
                .unwrap_or(cli.confidence_threshold),
            early_termination: file.early_termination.unwrap_or(!cli.exhaustive),
            early_termination_cutoff: file
                .early_termination_cutoff
                .unwrap_or(cli.early_termination_cutoff),
            weights: GapWeights {
                title: gap_file.title.unwrap_or(gap_defaults.title),
                artist: gap_file.artist.unwrap_or(gap_defaults.artist),
                combined: gap_file.combined.unwrap_or(gap_defaults.combined),
            },
            index,
        };

        let method = match file.method.as_deref() {
            Some(name) => parse_method(name).ok_or_else(|| {
                MatchError::InvalidConfig(format!("unknown duplicate method '{name}'"))
            })?,
            None => cli.method,
        };

        let dup_defaults = DuplicateWeights::default();
        let dup_file = file.duplicate_weights.clone().unwrap_or_default();
        let duration_defaults = DurationWeights::default();
        let duration_file = file.duration_weights.clone().unwrap_or_default();
        let duplicates = DuplicateSettings {
            similarity_threshold: file
                .similarity_threshold
                .unwrap_or(cli.similarity_threshold),
            method,
            weights: DuplicateWeights {
                title: dup_file.title.unwrap_or(dup_defaults.title),
                artist: dup_file.artist.unwrap_or(dup_defaults.artist),
                combined: dup_file.combined.unwrap_or(dup_defaults.combined),
            },
            duration_weights: DurationWeights {
                title: duration_file.title.unwrap_or(duration_defaults.title),
                duration: duration_file.duration.unwrap_or(duration_defaults.duration),
                penalty_per_second: duration_file
                    .penalty_per_second
                    .unwrap_or(duration_defaults.penalty_per_second),
            },
            index,
        };

        gap.validate()?;
        duplicates.validate()?;

        Ok(Self { gap, duplicates })
    }
}

/// Parses a duplicate method string into DuplicateMethod.
/// Uses clap's ValueEnum trait for parsing.
fn parse_method(s: &str) -> Option<DuplicateMethod> {
    DuplicateMethod::from_str(s, true).ok()
}
