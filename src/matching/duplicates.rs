//! Near-duplicate detection within the digital collection.
//!
//! Every record is compared against the candidates it shares an index
//! fragment with, under one of four scoring methods. Pairs at or above
//! the similarity threshold become edges of an undirected graph, and
//! each connected component of two or more records is reported as one
//! duplicate group.

use crate::error::MatchError;
use crate::matching::gap::validate_weights;
use crate::matching::index::{CandidateIndex, FragmentField, IndexSettings};
use crate::matching::similarity::{duration_similarity, ratio, weighted};
use crate::record::{validate_records, NormalizedKey, TrackRecord};
use clap::ValueEnum;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// How a pair of tracks is scored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMethod {
    /// Weighted artist/title/combined text similarity.
    ArtistTitle,
    /// Title similarity alone; catches covers and remixes sharing a
    /// title across different artists.
    TitleOnly,
    /// Similarity of the normalized file name, ignoring tag metadata.
    FilenameSimilarity,
    /// Title similarity blended with duration closeness. Records
    /// without a duration never match under this method.
    DurationTitle,
}

impl DuplicateMethod {
    fn index_fields(&self) -> &'static [FragmentField] {
        match self {
            DuplicateMethod::ArtistTitle => &[
                FragmentField::Artist,
                FragmentField::Title,
                FragmentField::Combined,
            ],
            DuplicateMethod::TitleOnly => &[FragmentField::Title],
            DuplicateMethod::FilenameSimilarity => &[FragmentField::Filename],
            DuplicateMethod::DurationTitle => &[FragmentField::Title],
        }
    }
}

/// Component weights for the `artist_title` composite.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateWeights {
    pub title: f64,
    pub artist: f64,
    pub combined: f64,
}

impl Default for DuplicateWeights {
    fn default() -> Self {
        Self {
            title: 0.5,
            artist: 0.3,
            combined: 0.2,
        }
    }
}

/// Weights and penalty for the `duration_title` composite.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationWeights {
    pub title: f64,
    pub duration: f64,
    /// Points of duration similarity lost per second of difference.
    pub penalty_per_second: f64,
}

impl Default for DurationWeights {
    fn default() -> Self {
        Self {
            title: 0.7,
            duration: 0.3,
            penalty_per_second: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSettings {
    /// Minimum pair score for two tracks to be considered duplicates.
    /// Default 85, effective range 60–95.
    pub similarity_threshold: u32,
    pub method: DuplicateMethod,
    pub weights: DuplicateWeights,
    pub duration_weights: DurationWeights,
    pub index: IndexSettings,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 85,
            method: DuplicateMethod::ArtistTitle,
            weights: DuplicateWeights::default(),
            duration_weights: DurationWeights::default(),
            index: IndexSettings::default(),
        }
    }
}

impl DuplicateSettings {
    pub fn validate(&self) -> Result<(), MatchError> {
        if !(60..=95).contains(&self.similarity_threshold) {
            return Err(MatchError::InvalidConfig(format!(
                "similarity_threshold must be in 60..=95, got {}",
                self.similarity_threshold
            )));
        }
        validate_weights(
            &[
                ("title", self.weights.title),
                ("artist", self.weights.artist),
                ("combined", self.weights.combined),
            ],
            self.weights.title + self.weights.artist + self.weights.combined,
        )?;
        validate_weights(
            &[
                ("title", self.duration_weights.title),
                ("duration", self.duration_weights.duration),
            ],
            self.duration_weights.title + self.duration_weights.duration,
        )?;
        if !self.duration_weights.penalty_per_second.is_finite()
            || self.duration_weights.penalty_per_second <= 0.0
        {
            return Err(MatchError::InvalidConfig(format!(
                "penalty_per_second must be a positive number, got {}",
                self.duration_weights.penalty_per_second
            )));
        }
        self.index.validate()
    }
}

/// A qualifying pairwise similarity retained from grouping, so the
/// consuming layer can rank group members (e.g. prefer the
/// highest-bitrate copy) without rescoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSimilarity {
    pub first_id: String,
    pub second_id: String,
    pub score: u32,
}

/// Two or more tracks judged mutually similar, directly or transitively.
/// Members are listed in collection order; the first member is the
/// group's representative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub members: Vec<String>,
    pub pairs: Vec<PairSimilarity>,
}

/// Find groups of near-duplicate tracks.
///
/// Grouping is transitive by design: if A~B and B~C both reach the
/// threshold, then A, B and C form one group even when A~C alone would
/// not qualify. That is intentional — it gathers remixes, covers and
/// alternate versions into one cluster — but it trades precision for
/// recall, and long chains can connect tracks whose endpoints are not
/// themselves similar. Groups are disjoint and emitted in collection
/// order of their first member.
pub fn find_duplicates(
    digital: &[TrackRecord],
    settings: &DuplicateSettings,
) -> Result<Vec<DuplicateGroup>, MatchError> {
    settings.validate()?;
    validate_records(digital)?;

    info!(
        "Starting duplicate search over {} tracks (threshold {}, method {:?})",
        digital.len(),
        settings.similarity_threshold,
        settings.method
    );

    let keys: Vec<NormalizedKey> = digital.iter().map(TrackRecord::normalized_key).collect();
    let index = CandidateIndex::build(&keys, settings.method.index_fields(), settings.index);

    // Qualifying pairs, restricted to position < candidate so each pair
    // is scored once. Fragment sharing is symmetric, so nothing is lost.
    let keys = keys.as_slice();
    let edges: Vec<(usize, usize, u32)> = (0..digital.len())
        .into_par_iter()
        .flat_map_iter(|position| {
            index
                .query(&keys[position], Some(position))
                .into_iter()
                .filter(move |&candidate| candidate > position)
                .filter_map(move |candidate| {
                    pair_score(position, candidate, digital, keys, settings)
                        .filter(|&score| score >= settings.similarity_threshold)
                        .map(|score| (position, candidate, score))
                })
        })
        .collect();

    let groups = group_edges(digital, &edges);

    info!(
        "Duplicate search complete: {} groups covering {} tracks",
        groups.len(),
        groups.iter().map(|g| g.members.len()).sum::<usize>()
    );

    Ok(groups)
}

fn pair_score(
    a: usize,
    b: usize,
    records: &[TrackRecord],
    keys: &[NormalizedKey],
    settings: &DuplicateSettings,
) -> Option<u32> {
    let (key_a, key_b) = (&keys[a], &keys[b]);
    match settings.method {
        DuplicateMethod::ArtistTitle => {
            let weights = &settings.weights;
            Some(weighted(&[
                (ratio(&key_a.title, &key_b.title), weights.title),
                (ratio(&key_a.artist, &key_b.artist), weights.artist),
                (ratio(&key_a.combined, &key_b.combined), weights.combined),
            ]))
        }
        DuplicateMethod::TitleOnly => Some(ratio(&key_a.title, &key_b.title)),
        DuplicateMethod::FilenameSimilarity => Some(ratio(&key_a.filename, &key_b.filename)),
        DuplicateMethod::DurationTitle => {
            let duration_a = records[a].duration_secs?;
            let duration_b = records[b].duration_secs?;
            let weights = &settings.duration_weights;
            Some(weighted(&[
                (ratio(&key_a.title, &key_b.title), weights.title),
                (
                    duration_similarity(duration_a, duration_b, weights.penalty_per_second),
                    weights.duration,
                ),
            ]))
        }
    }
}

/// Connected components over the qualifying pairs.
fn group_edges(records: &[TrackRecord], edges: &[(usize, usize, u32)]) -> Vec<DuplicateGroup> {
    let mut components = DisjointSet::new(records.len());
    for &(a, b, _) in edges {
        components.union(a, b);
    }

    // Scanning positions in ascending order keys each component by its
    // smallest member, which fixes both member order and group order.
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    for position in 0..records.len() {
        let root = components.find(position);
        if components.size_of(root) < 2 {
            continue;
        }
        let group_index = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(DuplicateGroup {
                members: Vec::new(),
                pairs: Vec::new(),
            });
            groups.len() - 1
        });
        groups[group_index]
            .members
            .push(records[position].id.clone());
    }

    for &(a, b, score) in edges {
        let root = components.find(a);
        let group_index = group_of_root[&root];
        groups[group_index].pairs.push(PairSimilarity {
            first_id: records[a].id.clone(),
            second_id: records[b].id.clone(),
            score,
        });
    }

    groups
}

/// Aggregate statistics over one duplicate-detection run.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateSummary {
    pub group_count: usize,
    pub grouped_tracks: usize,
    pub largest_group: usize,
    pub mean_pair_score: f64,
}

impl DuplicateSummary {
    pub fn from_groups(groups: &[DuplicateGroup]) -> Self {
        let pair_count: usize = groups.iter().map(|g| g.pairs.len()).sum();
        let score_sum: f64 = groups
            .iter()
            .flat_map(|g| &g.pairs)
            .map(|p| f64::from(p.score))
            .sum();
        Self {
            group_count: groups.len(),
            grouped_tracks: groups.iter().map(|g| g.members.len()).sum(),
            largest_group: groups.iter().map(|g| g.members.len()).max().unwrap_or(0),
            mean_pair_score: if pair_count == 0 {
                0.0
            } else {
                score_sum / pair_count as f64
            },
        }
    }
}

struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut root_a, mut root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return;
        }
        if self.size[root_a] < self.size[root_b] {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parent[root_b] = root_a;
        self.size[root_a] += self.size[root_b];
    }

    fn size_of(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceCollection;

    fn track(id: &str, artist: &str, title: &str) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            artist: artist.to_string(),
            title: title.to_string(),
            album: None,
            duration_secs: None,
            location: None,
            source: SourceCollection::Digital,
        }
    }

    fn with_duration(mut record: TrackRecord, secs: f64) -> TrackRecord {
        record.duration_secs = Some(secs);
        record
    }

    fn with_location(mut record: TrackRecord, location: &str) -> TrackRecord {
        record.location = Some(location.to_string());
        record
    }

    fn settings(method: DuplicateMethod, threshold: u32) -> DuplicateSettings {
        DuplicateSettings {
            method,
            similarity_threshold: threshold,
            ..DuplicateSettings::default()
        }
    }

    #[test]
    fn title_only_groups_a_remix_with_its_original() {
        let tracks = vec![
            track("d1", "Artist X", "Song Y"),
            track("d2", "Artist X", "Song Y (Remix)"),
            track("d3", "Artist Z", "Completely Else"),
        ];

        let groups =
            find_duplicates(&tracks, &settings(DuplicateMethod::TitleOnly, 70)).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec!["d1", "d2"]);
        assert_eq!(groups[0].pairs.len(), 1);
        assert_eq!(groups[0].pairs[0].score, 100);
    }

    #[test]
    fn artist_title_groups_tagged_variants() {
        let tracks = vec![
            track("d1", "New Order", "Blue Monday"),
            track("d2", "New Order", "Blue Monday [1988 version]"),
            track("d3", "Orbital", "Chime"),
        ];

        let groups =
            find_duplicates(&tracks, &settings(DuplicateMethod::ArtistTitle, 85)).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec!["d1", "d2"]);
    }

    #[test]
    fn grouping_is_transitive() {
        // d1~d2 and d2~d3 both qualify; d1~d3 scores lower but all three
        // must land in one group.
        let tracks = vec![
            track("d1", "", "abcdefgh"),
            track("d2", "", "abcdefgx"),
            track("d3", "", "abcdefxx"),
        ];
        let config = settings(DuplicateMethod::TitleOnly, 85);

        let direct = ratio("abcdefgh", "abcdefxx");
        assert!(direct < 85, "endpoints must not qualify directly: {direct}");

        let groups = find_duplicates(&tracks, &config).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec!["d1", "d2", "d3"]);
        // Only the qualifying edges are retained
        assert_eq!(groups[0].pairs.len(), 2);
    }

    #[test]
    fn groups_are_disjoint() {
        let tracks = vec![
            track("d1", "", "Blue Monday"),
            track("d2", "", "Blue Monday (Remix)"),
            track("d3", "", "Voodoo Ray"),
            track("d4", "", "Voodoo Ray (Live)"),
        ];

        let groups =
            find_duplicates(&tracks, &settings(DuplicateMethod::TitleOnly, 70)).unwrap();
        assert_eq!(groups.len(), 2);
        let mut seen = std::collections::HashSet::new();
        for group in &groups {
            assert!(group.members.len() >= 2);
            for member in &group.members {
                assert!(seen.insert(member.clone()), "{member} appears twice");
            }
        }
        // Stable order: group of d1 before group of d3
        assert_eq!(groups[0].members[0], "d1");
        assert_eq!(groups[1].members[0], "d3");
    }

    #[test]
    fn duration_title_follows_the_documented_formula() {
        // Identical titles, 5 seconds apart: duration similarity is
        // 100 - 5*5 = 75 and the composite rounds to 93.
        let tracks = vec![
            with_duration(track("d1", "LFO", "LFO"), 180.0),
            with_duration(track("d2", "LFO", "LFO"), 185.0),
        ];

        let groups =
            find_duplicates(&tracks, &settings(DuplicateMethod::DurationTitle, 85)).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].pairs[0].score, 93);

        // 15 seconds apart the composite is 0.7*100 + 0.3*25 = 78,
        // below an 85 threshold.
        let tracks = vec![
            with_duration(track("d1", "LFO", "LFO"), 180.0),
            with_duration(track("d2", "LFO", "LFO"), 195.0),
        ];
        let groups =
            find_duplicates(&tracks, &settings(DuplicateMethod::DurationTitle, 85)).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn duration_title_skips_records_without_a_duration() {
        let tracks = vec![
            with_duration(track("d1", "LFO", "LFO"), 180.0),
            track("d2", "LFO", "LFO"),
        ];

        let groups =
            find_duplicates(&tracks, &settings(DuplicateMethod::DurationTitle, 85)).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn filename_similarity_ignores_tag_metadata() {
        let tracks = vec![
            with_location(
                track("d1", "Unknown Artist", "Track 01"),
                "/rips/New Order - Blue Monday.mp3",
            ),
            with_location(
                track("d2", "New Order", "Blue Monday"),
                "/library/New Order - Blue Monday.flac",
            ),
            with_location(track("d3", "Orbital", "Chime"), "/library/Orbital - Chime.mp3"),
        ];

        let groups = find_duplicates(
            &tracks,
            &settings(DuplicateMethod::FilenameSimilarity, 85),
        )
        .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec!["d1", "d2"]);
    }

    #[test]
    fn below_threshold_pairs_are_not_grouped() {
        // The titles share an index fragment, so the pair is scored, but
        // it stays under the threshold.
        let tracks = vec![
            track("d1", "Orbital", "Chime"),
            track("d2", "Orbital", "Chimera"),
        ];

        let groups =
            find_duplicates(&tracks, &settings(DuplicateMethod::TitleOnly, 85)).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn rejects_threshold_outside_effective_range() {
        for threshold in [59, 96] {
            let config = settings(DuplicateMethod::ArtistTitle, threshold);
            assert!(config.validate().is_err(), "threshold {threshold}");
        }
    }

    #[test]
    fn summary_over_groups() {
        let tracks = vec![
            track("d1", "", "Blue Monday"),
            track("d2", "", "Blue Monday (Remix)"),
            track("d3", "", "Voodoo Ray"),
            track("d4", "", "Voodoo Ray (Live)"),
            track("d5", "", "Voodoo Ray (Demo)"),
        ];

        let groups =
            find_duplicates(&tracks, &settings(DuplicateMethod::TitleOnly, 70)).unwrap();
        let summary = DuplicateSummary::from_groups(&groups);
        assert_eq!(summary.group_count, 2);
        assert_eq!(summary.grouped_tracks, 5);
        assert_eq!(summary.largest_group, 3);
        assert!(summary.mean_pair_score > 0.0);

        let empty = DuplicateSummary::from_groups(&[]);
        assert_eq!(empty.mean_pair_score, 0.0);
        assert_eq!(empty.largest_group, 0);
    }

    #[test]
    fn deterministic_across_runs() {
        let tracks: Vec<TrackRecord> = (0..30)
            .map(|i| track(&format!("d{i}"), "New Order", &format!("Blue Monday {}", i % 3)))
            .collect();
        let config = settings(DuplicateMethod::ArtistTitle, 85);

        let first = find_duplicates(&tracks, &config).unwrap();
        let second = find_duplicates(&tracks, &config).unwrap();
        assert_eq!(first, second);
    }
}
