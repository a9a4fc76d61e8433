//! Answer resolver: decides which options to tap, in what order.
//!
//! Policy per question: try the association store first, fall back to the
//! oracle, map resolved tokens back to their on-screen bounds. Every failure
//! path degrades to an empty or partial tap list so the session loop can
//! skip the question and continue; no error escapes `resolve`.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::geometry::Bounds;
use crate::oracle::Oracle;
use crate::question::{Candidate, QuestionKind, Snapshot};
use crate::segment::segment;
use crate::store::{AssociationStore, PairSource};
use crate::tasks;

/// Confirmed result of a submitted answer, reported back by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
}

/// Per-text FIFO of candidate bounds, consumed at most once each.
///
/// Duplicate-text candidates are matched in scan order, left to right.
pub struct CandidatePool {
    queues: HashMap<String, VecDeque<Bounds>>,
}

impl CandidatePool {
    pub fn new(candidates: &[Candidate]) -> Self {
        let mut queues: HashMap<String, VecDeque<Bounds>> = HashMap::new();
        for candidate in candidates {
            queues
                .entry(candidate.text.clone())
                .or_default()
                .push_back(candidate.bounds);
        }
        Self { queues }
    }

    /// Pop the first unconsumed bounds for `text`, if any remain.
    pub fn take(&mut self, text: &str) -> Option<Bounds> {
        self.queues.get_mut(text).and_then(|q| q.pop_front())
    }
}

/// Orchestrates store lookup, oracle fallback, and bounds mapping.
pub struct AnswerResolver {
    store: AssociationStore,
    oracle: Arc<dyn Oracle>,
    max_attempts: usize,
    /// Timed-drill mode: bind matching pairs positionally, no inference.
    timed_pairs: bool,
}

impl AnswerResolver {
    pub fn new(store: AssociationStore, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            store,
            oracle,
            max_attempts: 3,
            timed_pairs: false,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_timed_pairs(mut self, timed_pairs: bool) -> Self {
        self.timed_pairs = timed_pairs;
        self
    }

    /// Resolve one question into an ordered tap list.
    ///
    /// An empty result means "skip this question"; the caller decides what
    /// to do with a partial list.
    pub fn resolve(&self, snapshot: &Snapshot) -> Vec<Bounds> {
        match snapshot.kind {
            QuestionKind::TranslateSentence => self.solve_translate_sentence(snapshot),
            QuestionKind::MatchingPairs => self.solve_matching_pairs(snapshot),
            QuestionKind::Unknown => {
                debug!("Unknown question kind, skipping");
                Vec::new()
            }
            _ => self.solve_word_choice(snapshot),
        }
    }

    /// Record a confirmed translation outcome so future questions hit the
    /// store instead of the oracle. An incorrect outcome overrides any
    /// stored pair.
    pub fn record_sentence_outcome(
        &self,
        original: &str,
        translated: &str,
        outcome: AnswerOutcome,
    ) -> Result<usize> {
        let source = match outcome {
            AnswerOutcome::Correct => PairSource::Unspecified,
            AnswerOutcome::Incorrect => PairSource::IncorrectAnswer,
        };
        self.store.insert_pair(original, translated, source)
    }

    /// Record a confirmed word association.
    pub fn record_word_outcome(&self, word: &str, answer: &str) -> Result<usize> {
        self.store
            .insert_group(&[word.to_string(), answer.to_string()])
    }

    fn solve_translate_sentence(&self, snapshot: &Snapshot) -> Vec<Bounds> {
        let texts = snapshot.candidate_texts();

        let translation = match self.store.complementary(&snapshot.prompt) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "Store lookup failed, falling back to oracle");
                None
            }
        };

        let ordered = match translation {
            Some(translation) => {
                info!(%translation, "Translation found in the store");
                segment(&translation, &texts).0
            }
            None => tasks::arrange_tokens(
                self.oracle.as_ref(),
                &snapshot.prompt,
                &texts,
                self.max_attempts,
            ),
        };

        let mut pool = CandidatePool::new(&snapshot.candidates);
        ordered.iter().filter_map(|t| pool.take(t)).collect()
    }

    fn solve_word_choice(&self, snapshot: &Snapshot) -> Vec<Bounds> {
        let texts = snapshot.candidate_texts();

        // Local relations first: any related word already among the options?
        let local = match self
            .store
            .find_matches(std::slice::from_ref(&snapshot.prompt), &texts)
        {
            Ok(matches) => matches.into_iter().next().and_then(|(_, hit)| hit),
            Err(e) => {
                warn!(error = %e, "Store lookup failed, falling back to oracle");
                None
            }
        };

        let answer = match local {
            Some(answer) => {
                info!(word = %snapshot.prompt, %answer, "Word match found in the store");
                Some(answer)
            }
            None => match tasks::pick_matching_word(self.oracle.as_ref(), &snapshot.prompt, &texts)
            {
                Ok(answer) => Some(answer),
                Err(e) => {
                    warn!(error = %e, word = %snapshot.prompt, "Oracle could not pick a word");
                    None
                }
            },
        };

        let mut pool = CandidatePool::new(&snapshot.candidates);
        answer
            .and_then(|a| pool.take(&a))
            .map(|b| vec![b])
            .unwrap_or_default()
    }

    fn solve_matching_pairs(&self, snapshot: &Snapshot) -> Vec<Bounds> {
        if self.timed_pairs {
            // Speed over correctness: bind positionally, no lookups at all.
            return snapshot
                .sources
                .iter()
                .zip(&snapshot.candidates)
                .flat_map(|(source, option)| [source.bounds, option.bounds])
                .collect();
        }

        let originals: Vec<String> = snapshot.sources.iter().map(|s| s.text.clone()).collect();
        let options = snapshot.candidate_texts();

        let mut assigned: Vec<Option<String>> = match self.store.find_matches(&originals, &options)
        {
            Ok(matches) => matches.into_iter().map(|(_, hit)| hit).collect(),
            Err(e) => {
                warn!(error = %e, "Store lookup failed for matching pairs");
                vec![None; originals.len()]
            }
        };

        // Options not yet claimed by a store match, each claim consuming one
        // occurrence.
        let mut unclaimed = options.clone();
        for claimed in assigned.iter().flatten() {
            if let Some(pos) = unclaimed.iter().position(|o| o == claimed) {
                unclaimed.remove(pos);
            }
        }

        let unmatched: Vec<usize> = assigned
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .map(|(i, _)| i)
            .collect();

        if unmatched.len() == 1 && unclaimed.len() == 1 {
            // Only one slot and one option left: forced assignment.
            info!(original = %originals[unmatched[0]], option = %unclaimed[0],
                "Inferred last remaining pair");
            assigned[unmatched[0]] = Some(unclaimed.remove(0));
        } else if !unmatched.is_empty() {
            let pending: Vec<String> = unmatched.iter().map(|&i| originals[i].clone()).collect();
            let ordered = tasks::order_pairs(
                self.oracle.as_ref(),
                &pending,
                &unclaimed,
                self.max_attempts,
            );
            for (&slot, answer) in unmatched.iter().zip(ordered) {
                assigned[slot] = Some(answer);
            }
        }

        let mut pool = CandidatePool::new(&snapshot.candidates);
        let mut taps = Vec::new();
        for (source, answer) in snapshot.sources.iter().zip(&assigned) {
            let bounds = answer.as_deref().and_then(|text| pool.take(text));
            if let Some(bounds) = bounds {
                taps.push(source.bounds);
                taps.push(bounds);
            }
        }
        taps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OracleError, ScriptedOracle};

    fn bounds(i: i32) -> Bounds {
        Bounds::new(i * 100, 1000, i * 100 + 90, 1100)
    }

    fn candidates(texts: &[&str]) -> Vec<Candidate> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Candidate::new(*t, bounds(i as i32)))
            .collect()
    }

    fn resolver_with(oracle: ScriptedOracle) -> (AnswerResolver, Arc<ScriptedOracle>) {
        let store = AssociationStore::open_in_memory().unwrap();
        let oracle = Arc::new(oracle);
        let resolver = AnswerResolver::new(store, oracle.clone());
        (resolver, oracle)
    }

    #[test]
    fn test_candidate_pool_consumes_duplicates_in_scan_order() {
        let cands = candidates(&["な", "な", "か"]);
        let mut pool = CandidatePool::new(&cands);
        assert_eq!(pool.take("な"), Some(bounds(0)));
        assert_eq!(pool.take("な"), Some(bounds(1)));
        assert_eq!(pool.take("な"), None);
        assert_eq!(pool.take("未知"), None);
    }

    #[test]
    fn test_translate_sentence_store_hit_skips_oracle() {
        let (resolver, oracle) = resolver_with(ScriptedOracle::always_error(
            OracleError::Http("should not be called".to_string()),
        ));
        resolver
            .record_sentence_outcome("请把土豆细切。", "じゃがいもを細かく刻んでください", AnswerOutcome::Correct)
            .unwrap();

        let snapshot = Snapshot::new(
            QuestionKind::TranslateSentence,
            "请把土豆细切。",
            candidates(&["を", "細かく", "で", "ください", "大豆", "刻ん", "じゃがいも"]),
        );
        let taps = resolver.resolve(&snapshot);
        // じゃがいも, を, 細かく, 刻ん, で, ください
        assert_eq!(
            taps,
            vec![bounds(6), bounds(0), bounds(1), bounds(5), bounds(2), bounds(3)]
        );
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn test_translate_sentence_oracle_fallback() {
        let (resolver, oracle) = resolver_with(ScriptedOracle::always("じゃがいも#を#ください"));
        let snapshot = Snapshot::new(
            QuestionKind::TranslateSentence,
            "请给我土豆",
            candidates(&["を", "ください", "大豆", "じゃがいも"]),
        );
        let taps = resolver.resolve(&snapshot);
        assert_eq!(taps, vec![bounds(3), bounds(0), bounds(1)]);
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn test_translate_sentence_exhaustion_skips() {
        let (resolver, oracle) = resolver_with(ScriptedOracle::always("garbage"));
        let snapshot = Snapshot::new(
            QuestionKind::TranslateSentence,
            "原句",
            candidates(&["を", "ください"]),
        );
        assert!(resolver.resolve(&snapshot).is_empty());
        assert_eq!(oracle.call_count(), 3);
    }

    #[test]
    fn test_word_choice_store_hit_skips_oracle() {
        let (resolver, oracle) = resolver_with(ScriptedOracle::always_error(
            OracleError::Http("should not be called".to_string()),
        ));
        resolver.record_word_outcome("cat", "猫").unwrap();

        let snapshot = Snapshot::new(
            QuestionKind::ChooseTranslation,
            "cat",
            candidates(&["犬", "猫", "鳥"]),
        );
        assert_eq!(resolver.resolve(&snapshot), vec![bounds(1)]);
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn test_word_choice_oracle_fallback() {
        let (resolver, _) = resolver_with(ScriptedOracle::always("猫"));
        let snapshot = Snapshot::new(
            QuestionKind::Pronunciation,
            "cat",
            candidates(&["犬", "猫", "鳥"]),
        );
        assert_eq!(resolver.resolve(&snapshot), vec![bounds(1)]);
    }

    #[test]
    fn test_word_choice_out_of_options_skips() {
        let (resolver, _) = resolver_with(ScriptedOracle::always("魚"));
        let snapshot = Snapshot::new(
            QuestionKind::ChoosePicture,
            "cat",
            candidates(&["犬", "猫"]),
        );
        assert!(resolver.resolve(&snapshot).is_empty());
    }

    #[test]
    fn test_matching_pairs_fully_resolved_by_store() {
        let (resolver, oracle) = resolver_with(ScriptedOracle::always_error(
            OracleError::Http("should not be called".to_string()),
        ));
        resolver.record_word_outcome("cat", "猫").unwrap();
        resolver.record_word_outcome("dog", "犬").unwrap();

        let snapshot = Snapshot::matching_pairs(
            candidates(&["cat", "dog"]),
            candidates(&["犬", "猫"]),
        );
        let taps = resolver.resolve(&snapshot);
        // cat -> 猫, dog -> 犬, interleaved source/option.
        assert_eq!(taps, vec![bounds(0), bounds(1), bounds(1), bounds(0)]);
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn test_matching_pairs_single_unmatched_is_inferred() {
        let (resolver, oracle) = resolver_with(ScriptedOracle::always_error(
            OracleError::Http("should not be called".to_string()),
        ));
        resolver.record_word_outcome("cat", "猫").unwrap();

        let snapshot = Snapshot::matching_pairs(
            candidates(&["cat", "dog"]),
            candidates(&["犬", "猫"]),
        );
        let taps = resolver.resolve(&snapshot);
        assert_eq!(taps, vec![bounds(0), bounds(1), bounds(1), bounds(0)]);
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn test_matching_pairs_oracle_orders_unmatched_subset() {
        let (resolver, oracle) = resolver_with(ScriptedOracle::always("猫#犬"));
        resolver.record_word_outcome("bird", "鳥").unwrap();

        let snapshot = Snapshot::matching_pairs(
            candidates(&["cat", "bird", "dog"]),
            candidates(&["鳥", "犬", "猫"]),
        );
        let taps = resolver.resolve(&snapshot);
        // bird matched locally; cat/dog ordered by the oracle as 猫, 犬.
        assert_eq!(
            taps,
            vec![
                bounds(0), // cat
                bounds(2), // 猫
                bounds(1), // bird
                bounds(0), // 鳥
                bounds(2), // dog
                bounds(1), // 犬
            ]
        );
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn test_matching_pairs_timed_mode_is_positional() {
        let (resolver, oracle) = resolver_with(ScriptedOracle::always_error(
            OracleError::Http("should not be called".to_string()),
        ));
        let resolver = resolver.with_timed_pairs(true);

        let snapshot = Snapshot::matching_pairs(
            candidates(&["cat", "dog"]),
            candidates(&["犬", "猫"]),
        );
        let taps = resolver.resolve(&snapshot);
        assert_eq!(taps, vec![bounds(0), bounds(0), bounds(1), bounds(1)]);
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn test_matching_pairs_unresolved_pair_dropped() {
        let (resolver, _) = resolver_with(ScriptedOracle::always("garbage"));
        let snapshot = Snapshot::matching_pairs(
            candidates(&["cat", "dog"]),
            candidates(&["犬", "猫"]),
        );
        // Store is empty and the oracle never validates: nothing to tap.
        assert!(resolver.resolve(&snapshot).is_empty());
    }

    #[test]
    fn test_unknown_kind_skipped() {
        let (resolver, oracle) = resolver_with(ScriptedOracle::always("anything"));
        let snapshot = Snapshot::new(QuestionKind::Unknown, "", candidates(&["a"]));
        assert!(resolver.resolve(&snapshot).is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn test_record_sentence_outcome_incorrect_overrides() {
        let (resolver, _) = resolver_with(ScriptedOracle::always("unused"));
        resolver
            .record_sentence_outcome("A", "B", AnswerOutcome::Correct)
            .unwrap();
        assert_eq!(
            resolver
                .record_sentence_outcome("A", "B", AnswerOutcome::Correct)
                .unwrap(),
            0
        );
        assert_eq!(
            resolver
                .record_sentence_outcome("A", "B", AnswerOutcome::Incorrect)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_duplicate_tiles_consumed_left_to_right() {
        let (resolver, _) = resolver_with(ScriptedOracle::always("な#な#か"));
        let snapshot = Snapshot::new(
            QuestionKind::TranslateSentence,
            "原句",
            candidates(&["な", "な", "か"]),
        );
        let taps = resolver.resolve(&snapshot);
        assert_eq!(taps, vec![bounds(0), bounds(1), bounds(2)]);
    }
}
