//! The approximate-matching core: normalization, similarity scoring,
//! candidate indexing, and the two analysis engines built on them.

pub mod duplicates;
pub mod gap;
pub mod index;
pub mod normalize;
pub mod similarity;

pub use duplicates::{
    find_duplicates, DuplicateGroup, DuplicateMethod, DuplicateSettings, DuplicateSummary,
    DuplicateWeights, DurationWeights, PairSimilarity,
};
pub use gap::{analyze_gaps, GapSettings, GapSummary, GapWeights, MatchResult, MatchStatus};
pub use index::{CandidateIndex, FragmentField, IndexSettings};
