//! Substring segmentation: rebuild a token sequence from a sentence and a
//! bag of candidate tiles.
//!
//! Used when the translation of a sentence is already known (from the store
//! or the oracle) and the answer must be expressed as an ordered subset of
//! the on-screen tiles.

use crate::text::strip_punctuation;

/// Find a maximal non-overlapping, order-preserving covering of `sentence`
/// by the candidate substrings.
///
/// Punctuation is stripped from the sentence before matching. Every
/// occurrence of every candidate is collected (the search cursor advances by
/// the match length after each hit, so occurrences of one candidate never
/// overlap each other), then matches are sorted by start offset with longer
/// candidates winning ties, and accepted greedily left to right whenever a
/// match starts at or after the end of the last accepted one.
///
/// Returns the accepted candidates in sentence order plus the leftover text
/// not covered by any accepted match. O(n*m) for sentence length n and m
/// candidates.
pub fn segment(sentence: &str, candidates: &[String]) -> (Vec<String>, String) {
    let sentence = strip_punctuation(sentence);

    // (byte offset, candidate) for every occurrence of every candidate.
    let mut found: Vec<(usize, &str)> = Vec::new();
    for cand in candidates {
        let cand = cand.as_str();
        if cand.is_empty() {
            // An empty needle matches everywhere and never advances.
            continue;
        }
        let mut from = 0;
        while let Some(pos) = sentence[from..].find(cand) {
            let start = from + pos;
            found.push((start, cand));
            from = start + cand.len();
        }
    }

    // Earliest start first; at equal starts the longer candidate wins.
    found.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())));

    let mut ordered: Vec<String> = Vec::new();
    let mut last_end = 0;
    for (start, cand) in found {
        if start >= last_end {
            ordered.push(cand.to_string());
            last_end = start + cand.len();
        }
    }

    // Remove each accepted candidate exactly once, in acceptance order.
    let mut leftover = sentence;
    for cand in &ordered {
        leftover = leftover.replacen(cand.as_str(), "", 1);
    }

    (ordered, leftover)
}
