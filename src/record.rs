//! Track records and their cached normalized keys.
//!
//! A [`TrackRecord`] is the unit of comparison for both engines: one song,
//! from either the digital or the physical collection, reduced to the
//! fields the matching core needs. Collaborators (the collection parsers
//! and the catalog-expansion pipeline) are responsible for producing them;
//! this module validates their contract once, at the boundary.

use crate::error::MatchError;
use crate::matching::normalize::{normalize, normalize_filename};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Which collection a record came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCollection {
    Digital,
    Physical,
}

impl fmt::Display for SourceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceCollection::Digital => write!(f, "digital"),
            SourceCollection::Physical => write!(f, "physical"),
        }
    }
}

/// One track from either collection.
///
/// `artist` and `title` may be empty; `album`, `duration_secs` and
/// `location` are optional. Records are immutable for the duration of an
/// analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Opaque identifier, unique within its collection.
    pub id: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Track length in seconds, when the source knows it.
    #[serde(default)]
    pub duration_secs: Option<f64>,
    /// Raw file path or name, used by filename-based duplicate detection.
    #[serde(default)]
    pub location: Option<String>,
    pub source: SourceCollection,
}

impl TrackRecord {
    pub fn normalized_key(&self) -> NormalizedKey {
        NormalizedKey::of(self)
    }
}

/// The canonicalized comparison fields of one record.
///
/// Normalization is a pure function of the record's text fields, so keys
/// can be computed once per run and reused for indexing and scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedKey {
    pub artist: String,
    pub title: String,
    /// Normalized artist and title joined with a single space.
    pub combined: String,
    /// Normalized basename of `location`, without its extension.
    pub filename: String,
}

impl NormalizedKey {
    pub fn of(record: &TrackRecord) -> Self {
        let artist = normalize(&record.artist);
        let title = normalize(&record.title);
        let combined = if artist.is_empty() {
            title.clone()
        } else if title.is_empty() {
            artist.clone()
        } else {
            format!("{artist} {title}")
        };
        let filename = record
            .location
            .as_deref()
            .map(normalize_filename)
            .unwrap_or_default();
        Self {
            artist,
            title,
            combined,
            filename,
        }
    }
}

/// Validate a collection before a run.
///
/// Durations must be finite and non-negative, and identifiers unique
/// within the collection. Anything else about a record is tolerated:
/// missing or empty text fields normalize to empty strings and simply
/// participate in scoring.
pub fn validate_records(records: &[TrackRecord]) -> Result<(), MatchError> {
    let mut seen_ids = HashSet::with_capacity(records.len());
    for record in records {
        if let Some(duration) = record.duration_secs {
            if !duration.is_finite() || duration < 0.0 {
                return Err(MatchError::InvalidDuration {
                    id: record.id.clone(),
                    value: duration,
                });
            }
        }
        if !seen_ids.insert(record.id.as_str()) {
            return Err(MatchError::DuplicateIdentifier {
                id: record.id.clone(),
                collection: record.source,
            });
        }
    }
    Ok(())
}
