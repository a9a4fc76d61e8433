//! Question model handed to the resolver by the UI-scraping collaborator.

use crate::geometry::Bounds;
use serde::{Deserialize, Serialize};

/// Kind of drill question, detected upstream from the challenge instruction.
///
/// A tagged enum rather than raw instruction strings so dispatch does not
/// depend on the UI locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    /// Rebuild a translation of a full sentence from word tiles.
    TranslateSentence,
    /// Pick the correct translation of a single word.
    ChooseTranslation,
    /// Pick the picture matching a single word (options carry caption text).
    ChoosePicture,
    /// Pick how a word is pronounced.
    Pronunciation,
    /// Pick the character(s) corresponding to a kana word.
    ChooseCharacter,
    /// Match left-column words to right-column translations.
    MatchingPairs,
    /// Anything the scraper could not classify; always skipped.
    Unknown,
}

impl QuestionKind {
    /// Kinds answered by picking exactly one option for a single prompt word.
    pub fn is_word_choice(&self) -> bool {
        matches!(
            self,
            QuestionKind::ChooseTranslation
                | QuestionKind::ChoosePicture
                | QuestionKind::Pronunciation
                | QuestionKind::ChooseCharacter
        )
    }
}

/// One on-screen tappable option.
///
/// Texts may repeat within a snapshot; bounds never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub bounds: Bounds,
}

impl Candidate {
    pub fn new(text: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }
}

/// Everything the resolver needs about one question screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub kind: QuestionKind,
    /// The sentence or word being asked about. Empty for matching pairs.
    pub prompt: String,
    /// Tappable answer options (the right column for matching pairs).
    pub candidates: Vec<Candidate>,
    /// Left-column originals for matching pairs; empty for other kinds.
    pub sources: Vec<Candidate>,
}

impl Snapshot {
    /// Snapshot for a sentence or single-word question.
    pub fn new(kind: QuestionKind, prompt: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            candidates,
            sources: Vec::new(),
        }
    }

    /// Snapshot for a matching-pairs question.
    pub fn matching_pairs(sources: Vec<Candidate>, candidates: Vec<Candidate>) -> Self {
        Self {
            kind: QuestionKind::MatchingPairs,
            prompt: String::new(),
            candidates,
            sources,
        }
    }

    /// Option display texts in scan order.
    pub fn candidate_texts(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.text.clone()).collect()
    }
}
