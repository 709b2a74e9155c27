//! Deduplication and ranking of raw provider results.
//!
//! Pure, stateless transform:
//!
//! 1. Drop every result whose identity key (normalised URL + title) was
//!    already seen. First occurrence in input order wins.
//! 2. Stable sort by snippet quality class, then engine reliability rank,
//!    then the provider's own position.
//! 3. Truncate to the tier cap.
//! 4. Assign dense ranks `1..=N`.

use std::collections::HashSet;

use crate::types::{MergedResult, RawResult};

/// Snippets longer than this many characters count as "quality" snippets.
pub const SNIPPET_QUALITY_THRESHOLD: usize = 20;

/// Lowercase, trim, and collapse internal whitespace runs to one space.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identity key used for deduplication: `normalize(url) \0 normalize(title)`.
pub fn identity_key(result: &RawResult) -> String {
    format!(
        "{}\u{0}{}",
        normalize_text(&result.url),
        normalize_text(&result.title)
    )
}

/// Whether the snippet is long enough to sort into the leading class.
/// Length is counted in characters as the provider returned them.
pub fn has_quality_snippet(result: &RawResult) -> bool {
    result.snippet.chars().count() > SNIPPET_QUALITY_THRESHOLD
}

/// Keep the first result per identity key, preserving input order.
pub fn deduplicate(results: Vec<RawResult>) -> Vec<RawResult> {
    let mut seen = HashSet::with_capacity(results.len());
    results
        .into_iter()
        .filter(|result| seen.insert(identity_key(result)))
        .collect()
}

/// Deduplicate, order, cap and re-rank `results`.
///
/// `cap` of `None` keeps every surviving result.
pub fn rank_results(results: Vec<RawResult>, cap: Option<usize>) -> Vec<MergedResult> {
    let mut unique = deduplicate(results);

    // sort_by_key is stable, so full ties keep first-seen order.
    unique.sort_by_key(|r| {
        (
            !has_quality_snippet(r),
            r.engine.reliability_rank,
            r.source_rank,
        )
    });

    if let Some(cap) = cap {
        unique.truncate(cap);
    }

    unique
        .into_iter()
        .zip(1u32..)
        .map(|(result, rank)| MergedResult { rank, result })
        .collect()
}
