//! Gap analysis: which physical tracks are missing from the digital
//! library.
//!
//! For each physical track the engine shortlists digital candidates via
//! the fragment index, scores each candidate on artist, title and
//! combined similarity, weights the components into one confidence
//! value, and classifies the track `found` or `missing` against the
//! confidence threshold. One result is emitted per physical track, in
//! input order.

use crate::error::MatchError;
use crate::matching::index::{CandidateIndex, FragmentField, IndexSettings};
use crate::matching::similarity::{ratio, weighted};
use crate::record::{validate_records, NormalizedKey, TrackRecord};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const GAP_INDEX_FIELDS: &[FragmentField] = &[
    FragmentField::Artist,
    FragmentField::Title,
    FragmentField::Combined,
];

/// Component weights for the gap-analysis composite. Title similarity
/// dominates; the combined string acts as a tie-breaker.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapWeights {
    pub title: f64,
    pub artist: f64,
    pub combined: f64,
}

impl Default for GapWeights {
    fn default() -> Self {
        Self {
            title: 0.6,
            artist: 0.3,
            combined: 0.1,
        }
    }
}

impl GapWeights {
    fn sum(&self) -> f64 {
        self.title + self.artist + self.combined
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapSettings {
    /// Minimum confidence for a `found` classification. Default 80,
    /// effective range 50–95.
    pub confidence_threshold: u32,
    /// Stop scanning a candidate list once the running best reaches
    /// `early_termination_cutoff`. A performance short-circuit: the
    /// cutoff must be at least the confidence threshold, so the
    /// found/missing classification never depends on it. Turn off for
    /// exhaustive verification.
    pub early_termination: bool,
    /// Default 95.
    pub early_termination_cutoff: u32,
    pub weights: GapWeights,
    pub index: IndexSettings,
}

impl Default for GapSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 80,
            early_termination: true,
            early_termination_cutoff: 95,
            weights: GapWeights::default(),
            index: IndexSettings::default(),
        }
    }
}

impl GapSettings {
    pub fn validate(&self) -> Result<(), MatchError> {
        if !(50..=95).contains(&self.confidence_threshold) {
            return Err(MatchError::InvalidConfig(format!(
                "confidence_threshold must be in 50..=95, got {}",
                self.confidence_threshold
            )));
        }
        if self.early_termination_cutoff < self.confidence_threshold
            || self.early_termination_cutoff > 100
        {
            return Err(MatchError::InvalidConfig(format!(
                "early_termination_cutoff must be in {}..=100, got {}",
                self.confidence_threshold, self.early_termination_cutoff
            )));
        }
        validate_weights(
            &[
                ("title", self.weights.title),
                ("artist", self.weights.artist),
                ("combined", self.weights.combined),
            ],
            self.weights.sum(),
        )?;
        self.index.validate()
    }
}

pub(crate) fn validate_weights(components: &[(&str, f64)], sum: f64) -> Result<(), MatchError> {
    for (name, weight) in components {
        if !weight.is_finite() || *weight < 0.0 || *weight > 1.0 {
            return Err(MatchError::InvalidConfig(format!(
                "weight '{name}' must be in [0, 1], got {weight}"
            )));
        }
    }
    if (sum - 1.0).abs() > 1e-6 {
        return Err(MatchError::InvalidConfig(format!(
            "weights must sum to 1, got {sum}"
        )));
    }
    Ok(())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Found,
    Missing,
}

/// The outcome of matching one physical track against the digital
/// collection. Component scores are kept for diagnostics regardless of
/// classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub physical_id: String,
    /// Best-matching digital track, when any candidate was scored.
    pub matched_digital_id: Option<String>,
    /// Weighted composite, 0–100.
    pub confidence: u32,
    pub artist_score: u32,
    pub title_score: u32,
    pub combined_score: u32,
    pub status: MatchStatus,
}

struct ScoredCandidate {
    position: usize,
    confidence: u32,
    artist_score: u32,
    title_score: u32,
    combined_score: u32,
}

/// Compare every physical track against the digital collection.
///
/// Returns one [`MatchResult`] per physical record, in input order.
/// Pure apart from logging: identical inputs and settings always yield
/// identical results.
pub fn analyze_gaps(
    physical: &[TrackRecord],
    digital: &[TrackRecord],
    settings: &GapSettings,
) -> Result<Vec<MatchResult>, MatchError> {
    settings.validate()?;
    validate_records(physical)?;
    validate_records(digital)?;

    info!(
        "Starting gap analysis: {} physical tracks against {} digital tracks (confidence threshold {})",
        physical.len(),
        digital.len(),
        settings.confidence_threshold
    );

    let digital_keys: Vec<NormalizedKey> =
        digital.iter().map(TrackRecord::normalized_key).collect();
    let index = CandidateIndex::build(&digital_keys, GAP_INDEX_FIELDS, settings.index);
    debug!("Digital index has {} fragment entries", index.entry_count());

    // Each physical record is scored independently against the read-only
    // index; collect restores input order.
    let results: Vec<MatchResult> = physical
        .par_iter()
        .map(|track| match_one(track, digital, &digital_keys, &index, settings))
        .collect();

    let summary = GapSummary::from_results(&results);
    info!(
        "Gap analysis complete: {}/{} found ({:.1}%), {} missing ({:.1}%)",
        summary.found, summary.total_tracks, summary.found_pct, summary.missing, summary.missing_pct
    );

    Ok(results)
}

fn match_one(
    physical: &TrackRecord,
    digital: &[TrackRecord],
    digital_keys: &[NormalizedKey],
    index: &CandidateIndex,
    settings: &GapSettings,
) -> MatchResult {
    let key = physical.normalized_key();
    let candidates = index.query(&key, None);
    debug!(
        "Checking {} candidates for: {} - {}",
        candidates.len(),
        key.artist,
        key.title
    );

    let mut best: Option<ScoredCandidate> = None;
    for position in candidates {
        let candidate = &digital_keys[position];
        let artist_score = ratio(&key.artist, &candidate.artist);
        let title_score = ratio(&key.title, &candidate.title);
        let combined_score = ratio(&key.combined, &candidate.combined);
        let confidence = weighted(&[
            (title_score, settings.weights.title),
            (artist_score, settings.weights.artist),
            (combined_score, settings.weights.combined),
        ]);

        // Strictly-greater keeps the first-encountered candidate on ties,
        // which is what makes the pick stable.
        if best.as_ref().map_or(true, |b| confidence > b.confidence) {
            best = Some(ScoredCandidate {
                position,
                confidence,
                artist_score,
                title_score,
                combined_score,
            });
        }

        if settings.early_termination {
            if let Some(b) = &best {
                if b.confidence >= settings.early_termination_cutoff {
                    debug!("Near-perfect match ({}), stopping scan", b.confidence);
                    break;
                }
            }
        }
    }

    match best {
        Some(b) => {
            let status = if b.confidence >= settings.confidence_threshold {
                MatchStatus::Found
            } else {
                MatchStatus::Missing
            };
            MatchResult {
                physical_id: physical.id.clone(),
                matched_digital_id: Some(digital[b.position].id.clone()),
                confidence: b.confidence,
                artist_score: b.artist_score,
                title_score: b.title_score,
                combined_score: b.combined_score,
                status,
            }
        }
        None => MatchResult {
            physical_id: physical.id.clone(),
            matched_digital_id: None,
            confidence: 0,
            artist_score: 0,
            title_score: 0,
            combined_score: 0,
            status: MatchStatus::Missing,
        },
    }
}

/// Aggregate statistics over one gap-analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct GapSummary {
    pub total_tracks: usize,
    pub found: usize,
    pub missing: usize,
    pub found_pct: f64,
    pub missing_pct: f64,
    pub mean_confidence: f64,
}

impl GapSummary {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let total = results.len();
        let found = results
            .iter()
            .filter(|r| r.status == MatchStatus::Found)
            .count();
        let missing = total - found;
        let (found_pct, missing_pct, mean_confidence) = if total == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (
                found as f64 / total as f64 * 100.0,
                missing as f64 / total as f64 * 100.0,
                results.iter().map(|r| f64::from(r.confidence)).sum::<f64>() / total as f64,
            )
        };
        Self {
            total_tracks: total,
            found,
            missing,
            found_pct,
            missing_pct,
            mean_confidence,
        }
    }
}
