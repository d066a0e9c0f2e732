use crate::record::SourceCollection;
use thiserror::Error;

/// Rejections the matching core can produce before a run starts.
///
/// Once inputs and configuration pass validation, every operation in the
/// core is total: scoring and grouping never fail at runtime.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("track '{id}': duration must be a finite, non-negative number of seconds, got {value}")]
    InvalidDuration { id: String, value: f64 },

    #[error("duplicate track identifier '{id}' in the {collection} collection")]
    DuplicateIdentifier {
        id: String,
        collection: SourceCollection,
    },
}
