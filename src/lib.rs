//! Cratematch Library
//!
//! Reconciles two catalogs of the same music collection: a digital
//! library of tracks and a physical (vinyl/CD) collection expanded to
//! individual tracks by an external pipeline. Gap analysis reports
//! which physical tracks are missing from the digital library;
//! duplicate detection finds clusters of near-identical digital tracks.
//! Both run on fuzzy text similarity over a fragment index, entirely
//! in memory; parsing, catalog expansion and reporting live in external
//! collaborators that exchange [`record::TrackRecord`] sequences with
//! this crate.

pub mod config;
pub mod error;
pub mod matching;
pub mod record;

// Re-export commonly used types for convenience
pub use error::MatchError;
pub use matching::{
    analyze_gaps, find_duplicates, DuplicateGroup, DuplicateMethod, DuplicateSettings,
    DuplicateSummary, GapSettings, GapSummary, MatchResult, MatchStatus,
};
pub use record::{validate_records, SourceCollection, TrackRecord};
