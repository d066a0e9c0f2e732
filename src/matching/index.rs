//! Fragment-based candidate indexing.
//!
//! Comparing every record against every other is quadratic; the candidate
//! index cuts the set examined per query down to records that share a
//! short prefix of a normalized field. For each indexed record the index
//! stores its position under a fragment per field; a query unions the
//! positions of every fragment its key produces, in a stable order, and
//! caps the result.
//!
//! The trade-off: two similar strings that differ within the first few
//! characters (a leading typo, say) share no fragment and are never
//! compared in full. That loss of recall is accepted in exchange for
//! bounding the per-query work; it is a property of the design, not a
//! defect.

use crate::error::MatchError;
use crate::record::NormalizedKey;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Which normalized field a fragment was derived from. Fragments from
/// different fields never collide, even when their text is equal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FragmentField {
    Artist,
    Title,
    Combined,
    Filename,
}

impl FragmentField {
    fn text_of<'a>(&self, key: &'a NormalizedKey) -> &'a str {
        match self {
            FragmentField::Artist => &key.artist,
            FragmentField::Title => &key.title,
            FragmentField::Combined => &key.combined,
            FragmentField::Filename => &key.filename,
        }
    }
}

/// Tunables for index construction and querying.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Prefix length (in grapheme clusters) for single-field fragments.
    pub fragment_len: usize,
    /// Prefix length for the combined artist+title field.
    pub combined_fragment_len: usize,
    /// Maximum candidates returned per query.
    pub candidate_cap: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            fragment_len: 4,
            combined_fragment_len: 6,
            candidate_cap: 200,
        }
    }
}

impl IndexSettings {
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.fragment_len == 0 || self.combined_fragment_len == 0 {
            return Err(MatchError::InvalidConfig(
                "fragment lengths must be at least 1".to_string(),
            ));
        }
        if self.candidate_cap == 0 {
            return Err(MatchError::InvalidConfig(
                "candidate_cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The fragment a field of `key` produces, or `None` when the field
    /// is empty. A field shorter than the fragment length is indexed
    /// under the whole field.
    fn fragment_of(&self, field: FragmentField, key: &NormalizedKey) -> Option<String> {
        let text = field.text_of(key);
        if text.is_empty() {
            return None;
        }
        let len = match field {
            FragmentField::Combined => self.combined_fragment_len,
            _ => self.fragment_len,
        };
        Some(text.graphemes(true).take(len).collect())
    }
}

/// Inverted index from field-tagged fragments to record positions.
///
/// Built once per analysis run over the full record sequence and
/// treated as read-only afterwards, so parallel scoring can share it.
pub struct CandidateIndex {
    entries: HashMap<(FragmentField, String), Vec<usize>>,
    fields: Vec<FragmentField>,
    settings: IndexSettings,
}

impl CandidateIndex {
    /// Index `keys` under the given fields. Positions are registered in
    /// input order, which is what makes capped queries reproducible.
    pub fn build(keys: &[NormalizedKey], fields: &[FragmentField], settings: IndexSettings) -> Self {
        let mut entries: HashMap<(FragmentField, String), Vec<usize>> = HashMap::new();
        for (position, key) in keys.iter().enumerate() {
            for &field in fields {
                if let Some(fragment) = settings.fragment_of(field, key) {
                    entries.entry((field, fragment)).or_default().push(position);
                }
            }
        }
        Self {
            entries,
            fields: fields.to_vec(),
            settings,
        }
    }

    /// Positions of records sharing at least one fragment with `key`,
    /// deduplicated, in first-seen order (fields in their declared
    /// order, positions in input order within each fragment), capped at
    /// `candidate_cap`. `exclude` drops the query record itself when
    /// querying the collection it was indexed in.
    pub fn query(&self, key: &NormalizedKey, exclude: Option<usize>) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for &field in &self.fields {
            let Some(fragment) = self.settings.fragment_of(field, key) else {
                continue;
            };
            let Some(positions) = self.entries.get(&(field, fragment)) else {
                continue;
            };
            for &position in positions {
                if exclude == Some(position) {
                    continue;
                }
                if seen.insert(position) {
                    candidates.push(position);
                }
            }
        }
        candidates.truncate(self.settings.candidate_cap);
        candidates
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SourceCollection, TrackRecord};

    fn key(artist: &str, title: &str) -> NormalizedKey {
        TrackRecord {
            id: String::new(),
            artist: artist.to_string(),
            title: title.to_string(),
            album: None,
            duration_secs: None,
            location: None,
            source: SourceCollection::Digital,
        }
        .normalized_key()
    }

    const FIELDS: &[FragmentField] = &[
        FragmentField::Artist,
        FragmentField::Title,
        FragmentField::Combined,
    ];

    #[test]
    fn finds_records_sharing_a_prefix() {
        let keys = vec![
            key("New Order", "Blue Monday"),
            key("New Order", "Ceremony"),
            key("Orbital", "Chime"),
        ];
        let index = CandidateIndex::build(&keys, FIELDS, IndexSettings::default());

        let candidates = index.query(&key("New Order", "Blue Monday - Remix"), None);
        assert_eq!(candidates, vec![0, 1]);

        let candidates = index.query(&key("Orbital", "Halcyon"), None);
        assert_eq!(candidates, vec![2]);
    }

    #[test]
    fn no_shared_fragment_means_no_candidates() {
        let keys = vec![key("New Order", "Blue Monday")];
        let index = CandidateIndex::build(&keys, FIELDS, IndexSettings::default());
        assert!(index.query(&key("Kraftwerk", "Autobahn"), None).is_empty());
    }

    #[test]
    fn short_fields_are_indexed_whole() {
        let keys = vec![key("M83", "Run")];
        let index = CandidateIndex::build(&keys, FIELDS, IndexSettings::default());
        assert_eq!(index.query(&key("M83", "Runaway"), None), vec![0]);
    }

    #[test]
    fn excludes_the_query_record_itself() {
        let keys = vec![
            key("New Order", "Blue Monday"),
            key("New Order", "Blue Monday"),
        ];
        let index = CandidateIndex::build(&keys, FIELDS, IndexSettings::default());
        assert_eq!(index.query(&keys[0], Some(0)), vec![1]);
    }

    #[test]
    fn empty_fields_produce_no_fragments() {
        let keys = vec![key("", "")];
        let index = CandidateIndex::build(&keys, FIELDS, IndexSettings::default());
        assert_eq!(index.entry_count(), 0);
        assert!(index.query(&key("", ""), None).is_empty());
    }

    #[test]
    fn capping_is_deterministic() {
        let keys: Vec<NormalizedKey> = (0..50)
            .map(|i| key("New Order", &format!("Blue Monday {i}")))
            .collect();
        let settings = IndexSettings {
            candidate_cap: 10,
            ..IndexSettings::default()
        };
        let index = CandidateIndex::build(&keys, FIELDS, settings);

        let query = key("New Order", "Blue Monday");
        let first = index.query(&query, None);
        assert_eq!(first.len(), 10);
        // Insertion order, repeatably
        assert_eq!(first, (0..10).collect::<Vec<_>>());
        for _ in 0..5 {
            assert_eq!(index.query(&query, None), first);
        }
    }

    #[test]
    fn rejects_zero_settings() {
        assert!(IndexSettings {
            fragment_len: 0,
            ..IndexSettings::default()
        }
        .validate()
        .is_err());
        assert!(IndexSettings {
            candidate_cap: 0,
            ..IndexSettings::default()
        }
        .validate()
        .is_err());
    }
}
