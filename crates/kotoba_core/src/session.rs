//! Offline session-file processing.
//!
//! Scraped course session files carry the answers to every challenge; this
//! module extracts sentence pairs and word pairs from the challenge list so
//! they can be bulk-loaded into the association store. One `Extracted` per
//! file; files are independent, so callers parse them in parallel and merge
//! afterward.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::store::{AssociationStore, PairSource};

/// One sentence-translation record from a session file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub original: String,
    pub translated: String,
}

/// Everything extracted from one or more session files.
#[derive(Debug, Default, Clone)]
pub struct Extracted {
    pub sentence_pairs: Vec<SentenceRecord>,
    pub word_pairs: Vec<(String, String)>,
}

impl Extracted {
    pub fn is_empty(&self) -> bool {
        self.sentence_pairs.is_empty() && self.word_pairs.is_empty()
    }

    /// Append another extraction result (the post-worker merge step).
    pub fn merge(&mut self, other: Extracted) {
        self.sentence_pairs.extend(other.sentence_pairs);
        self.word_pairs.extend(other.word_pairs);
    }

    /// Drop exact duplicates, keeping the first occurrence of each record.
    pub fn dedup(&mut self) {
        let mut seen_sentences = std::collections::HashSet::new();
        self.sentence_pairs
            .retain(|p| seen_sentences.insert((p.original.clone(), p.translated.clone())));

        let mut seen_words = std::collections::HashSet::new();
        self.word_pairs.retain(|p| seen_words.insert(p.clone()));
    }
}

/// Counts reported after persisting an extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportSummary {
    pub sentence_total: usize,
    pub sentence_written: usize,
    pub word_total: usize,
    pub word_written: usize,
}

/// Extract learnable records from one parsed session file.
pub fn process_session(data: &Value) -> Extracted {
    let mut out = Extracted::default();

    let challenges = match data.get("challenges").and_then(|v| v.as_array()) {
        Some(c) => c,
        None => return out,
    };

    for challenge in challenges {
        process_challenge(challenge, &mut out);
    }
    out
}

fn process_challenge(challenge: &Value, out: &mut Extracted) {
    let kind = challenge
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    match kind {
        // Full sentences with their translations.
        "translate" => {
            push_sentence(out, challenge, "sentence", "translation");
        }
        "listenTap" => {
            push_sentence(out, challenge, "text", "solution_translation");
        }
        // Token pair lists.
        "match" => push_pairs(out, challenge, "fromToken", "learningToken"),
        "characterMatch" => push_pairs(out, challenge, "character", "transliteration"),
        // Prompt plus the correct choice.
        "assist" | "characterIntro" => {
            if let (Some(prompt), Some(choice)) = (prompt_of(challenge), correct_choice(challenge))
            {
                if let Some(choice) = choice.as_str() {
                    out.word_pairs.push((prompt.to_string(), choice.to_string()));
                }
            }
        }
        "select" => push_choice_field(out, challenge, "phrase"),
        "characterSelect" => push_choice_field(out, challenge, "character"),
        "selectPronunciation" => {
            debug!("Skipping selectPronunciation challenge");
        }
        other => {
            debug!(kind = other, "No extraction for challenge type");
        }
    }
}

fn push_sentence(out: &mut Extracted, challenge: &Value, original_key: &str, translated_key: &str) {
    let metadata = challenge.get("metadata");
    let get = |key: &str| {
        metadata
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };
    if let (Some(original), Some(translated)) = (get(original_key), get(translated_key)) {
        out.sentence_pairs.push(SentenceRecord {
            original,
            translated,
        });
    }
}

fn push_pairs(out: &mut Extracted, challenge: &Value, from_key: &str, to_key: &str) {
    let pairs = match challenge.get("pairs").and_then(|v| v.as_array()) {
        Some(p) => p,
        None => return,
    };
    for pair in pairs {
        let get = |key: &str| pair.get(key).and_then(|v| v.as_str());
        if let (Some(from), Some(to)) = (get(from_key), get(to_key)) {
            out.word_pairs.push((from.to_string(), to.to_string()));
        }
    }
}

fn push_choice_field(out: &mut Extracted, challenge: &Value, field: &str) {
    if let (Some(prompt), Some(choice)) = (prompt_of(challenge), correct_choice(challenge)) {
        if let Some(text) = choice.get(field).and_then(|v| v.as_str()) {
            out.word_pairs.push((prompt.to_string(), text.to_string()));
        }
    }
}

fn prompt_of(challenge: &Value) -> Option<&str> {
    challenge.get("prompt").and_then(|v| v.as_str())
}

fn correct_choice(challenge: &Value) -> Option<&Value> {
    let index = challenge.get("correctIndex").and_then(|v| v.as_u64())? as usize;
    challenge.get("choices").and_then(|v| v.as_array())?.get(index)
}

/// Write an extraction into the store, returning per-kind counts.
pub fn persist(store: &AssociationStore, extracted: &Extracted) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        sentence_total: extracted.sentence_pairs.len(),
        word_total: extracted.word_pairs.len(),
        ..Default::default()
    };

    for pair in &extracted.sentence_pairs {
        summary.sentence_written +=
            store.insert_pair(&pair.original, &pair.translated, PairSource::Unspecified)?;
    }
    for (from, to) in &extracted.word_pairs {
        summary.word_written += store.insert_group(&[from.clone(), to.clone()])?;
    }

    Ok(summary)
}
