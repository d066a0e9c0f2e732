//! Edit-distance similarity scoring.
//!
//! Provides the bounded [0, 100] `ratio` both engines score with, plus
//! the weighted-composite and duration-closeness helpers. Distances are
//! computed over grapheme clusters so that combining sequences count as
//! single edits.

use unicode_segmentation::UnicodeSegmentation;

/// Calculate the Levenshtein (edit) distance between two strings.
/// Returns the minimum number of single-grapheme edits (insertions,
/// deletions, or substitutions) required to change one string into the
/// other.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_graphemes: Vec<&str> = a.graphemes(true).collect();
    let b_graphemes: Vec<&str> = b.graphemes(true).collect();
    let a_len = a_graphemes.len();
    let b_len = b_graphemes.len();

    // Quick returns for empty strings
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Use two rows instead of full matrix for space efficiency
    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_grapheme) in a_graphemes.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_grapheme) in b_graphemes.iter().enumerate() {
            let cost = if a_grapheme == b_grapheme { 0 } else { 1 };

            curr_row[j + 1] = (prev_row[j + 1] + 1) // deletion
                .min(curr_row[j] + 1) // insertion
                .min(prev_row[j] + cost); // substitution
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Normalized edit similarity between two strings, in [0, 100].
///
/// `100` for identical strings — including two empty strings, a known
/// edge case that can produce misleading near-perfect scores when both
/// records lack a field; downstream thresholds are expected to filter
/// those. `0` when the strings share no useful alignment. Symmetric in
/// its arguments.
pub fn ratio(a: &str, b: &str) -> u32 {
    let a_len = a.graphemes(true).count();
    let b_len = b.graphemes(true).count();
    if a_len == 0 && b_len == 0 {
        return 100;
    }

    let total = a_len + b_len;
    let matched = total.saturating_sub(2 * levenshtein_distance(a, b));
    ((matched * 100) as f64 / total as f64).round() as u32
}

/// Combine component scores with their weights, rounding to the nearest
/// point. Callers pass weights that sum to 1, so the result stays in
/// [0, 100].
pub fn weighted(components: &[(u32, f64)]) -> u32 {
    components
        .iter()
        .map(|(score, weight)| f64::from(*score) * weight)
        .sum::<f64>()
        .round() as u32
}

/// Closeness of two durations, in [0, 100]: each second of difference
/// costs `penalty_per_second` points, floored at 0.
pub fn duration_similarity(a_secs: f64, b_secs: f64, penalty_per_second: f64) -> u32 {
    (100.0 - (a_secs - b_secs).abs() * penalty_per_second)
        .clamp(0.0, 100.0)
        .round() as u32
}
