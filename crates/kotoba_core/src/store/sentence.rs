//! Sentence-pair side of the association store.
//!
//! Approximate lookup: substring search narrows the rows, edit distance
//! ranks them, and a punctuation-only equality gate decides acceptance.

use super::AssociationStore;
use anyhow::Result;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use strsim::levenshtein;
use tracing::{debug, warn};

use crate::text::equal_ignoring_punctuation;

/// How a stored pair was learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairSource {
    /// Bulk import or a confirmed correct answer.
    Unspecified,
    /// Correction observed after answering wrong; overrides the stored pair.
    IncorrectAnswer,
}

impl PairSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairSource::Unspecified => "",
            PairSource::IncorrectAnswer => "incorrect_answer",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "incorrect_answer" => PairSource::IncorrectAnswer,
            _ => PairSource::Unspecified,
        }
    }
}

/// One stored sentence-translation pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentencePair {
    pub id: i64,
    pub original: String,
    pub translated: String,
    pub source: PairSource,
}

impl AssociationStore {
    /// Insert a sentence pair, or update it in place when re-learned from an
    /// incorrect answer. Returns the number of rows written (0 or 1).
    ///
    /// Blank sentences are rejected with zero effect; an existing identical
    /// pair is a no-op unless `source` is `IncorrectAnswer`.
    pub fn insert_pair(
        &self,
        original: &str,
        translated: &str,
        source: PairSource,
    ) -> Result<usize> {
        if original.trim().is_empty() || translated.trim().is_empty() {
            warn!("Refusing to insert blank sentence pair");
            return Ok(0);
        }

        let conn = self.conn();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM sentence_pairs WHERE original = ? AND translated = ?",
                params![original, translated],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO sentence_pairs (original, translated, source) VALUES (?, ?, ?)",
                    params![original, translated, source.as_str()],
                )?;
                debug!(original, "Inserted sentence pair");
                Ok(1)
            }
            Some(id) if source == PairSource::IncorrectAnswer => {
                conn.execute(
                    "UPDATE sentence_pairs SET original = ?, translated = ?, source = ? WHERE id = ?",
                    params![original, translated, source.as_str(), id],
                )?;
                debug!(original, id, "Overrode sentence pair from incorrect answer");
                Ok(1)
            }
            Some(_) => Ok(0),
        }
    }

    /// Substring search against both columns. Order unspecified.
    pub fn find_pairs(&self, query: &str) -> Result<Vec<(String, String)>> {
        let conn = self.conn();
        let pattern = format!("%{}%", query);

        let mut stmt = conn.prepare(
            "SELECT original, translated FROM sentence_pairs
             WHERE original LIKE ? OR translated LIKE ?",
        )?;
        let rows = stmt.query_map(params![pattern, pattern], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }
        Ok(pairs)
    }

    /// Find the other side of the stored pair closest to `query`.
    ///
    /// Among all substring matches, the side (original or translated) with
    /// the minimum edit distance to `query` is chosen; its partner is
    /// returned only if the chosen side equals `query` up to punctuation.
    /// Edit distance ranks candidates, the punctuation gate decides.
    pub fn complementary(&self, query: &str) -> Result<Option<String>> {
        let results = self.find_pairs(query)?;
        if results.is_empty() {
            return Ok(None);
        }

        let mut lowest = usize::MAX;
        let mut best: Option<(String, String)> = None; // (matched side, partner)
        for (original, translated) in results {
            let distance = levenshtein(query, &original);
            if distance < lowest {
                lowest = distance;
                best = Some((original.clone(), translated.clone()));
            }
            let distance = levenshtein(query, &translated);
            if distance < lowest {
                lowest = distance;
                best = Some((translated, original));
            }
        }

        match best {
            Some((matched, partner)) if equal_ignoring_punctuation(query, &matched) => {
                debug!(query, distance = lowest, "Complementary sentence found");
                Ok(Some(partner))
            }
            _ => Ok(None),
        }
    }

    /// Full dump, for inspection tooling.
    pub fn all_pairs(&self) -> Result<Vec<SentencePair>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, original, translated, source FROM sentence_pairs")?;
        let rows = stmt.query_map([], |row| {
            Ok(SentencePair {
                id: row.get(0)?,
                original: row.get(1)?,
                translated: row.get(2)?,
                source: PairSource::from_str(&row.get::<_, String>(3)?),
            })
        })?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }
        Ok(pairs)
    }

    pub fn sentence_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: usize = conn.query_row("SELECT COUNT(*) FROM sentence_pairs", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }
}
