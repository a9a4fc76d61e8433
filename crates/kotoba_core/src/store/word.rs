//! Word-group side of the association store.
//!
//! Words sharing a group id form a "related" equivalence class that grows as
//! new pairs are learned. Conflicting memberships are overwritten, not
//! merged: when a new pair bridges two groups, the bridged word moves to the
//! adopted group and the rest of its old group stays behind.

use super::AssociationStore;
use anyhow::Result;
use rusqlite::{params, params_from_iter, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

impl AssociationStore {
    /// Record that all `words` are mutually related. Returns the number of
    /// rows written (inserts plus reassignments).
    ///
    /// If none of the words are known, a fresh group id is minted for all of
    /// them. Otherwise the group id of the first known word (in insertion
    /// order) is adopted: unknown words are inserted under it and known
    /// words under a different group are reassigned to it. Unchanged
    /// memberships do not count. Blank words are skipped.
    pub fn insert_group(&self, words: &[String]) -> Result<usize> {
        let words: Vec<&str> = words
            .iter()
            .map(|w| w.as_str())
            .filter(|w| !w.trim().is_empty())
            .collect();
        if words.is_empty() {
            return Ok(0);
        }

        let conn = self.conn();

        let placeholders = vec!["?"; words.len()].join(", ");
        let sql = format!(
            "SELECT word, group_id FROM word_pairs WHERE word IN ({}) ORDER BY id",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(words.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut existing: Vec<(String, String)> = Vec::new();
        for row in rows {
            existing.push(row?);
        }

        let mut written = 0;
        if existing.is_empty() {
            let group_id = Uuid::new_v4().to_string();
            for word in &words {
                conn.execute(
                    "INSERT INTO word_pairs (word, group_id) VALUES (?, ?)",
                    params![word, group_id],
                )?;
                written += 1;
            }
            debug!(%group_id, count = written, "Created new word group");
        } else {
            // Adopt the first known word's group for the whole batch.
            let group_id = existing[0].1.clone();
            for word in &words {
                match existing.iter().find(|(w, _)| w.as_str() == *word) {
                    None => {
                        conn.execute(
                            "INSERT INTO word_pairs (word, group_id) VALUES (?, ?)",
                            params![word, group_id],
                        )?;
                        written += 1;
                    }
                    Some((_, current)) if *current != group_id => {
                        // Overwrite, not merge: the rest of the old group is
                        // left behind under its old id.
                        conn.execute(
                            "UPDATE word_pairs SET group_id = ? WHERE word = ?",
                            params![group_id, word],
                        )?;
                        written += 1;
                    }
                    Some(_) => {}
                }
            }
            debug!(%group_id, count = written, "Extended word group");
        }

        Ok(written)
    }

    /// All words sharing `word`'s group, including `word` itself. Empty if
    /// the word is unknown.
    pub fn related_words(&self, word: &str) -> Result<Vec<String>> {
        let conn = self.conn();

        let group_id: Option<String> = conn
            .query_row(
                "SELECT group_id FROM word_pairs WHERE word = ?",
                params![word],
                |row| row.get(0),
            )
            .optional()?;

        let group_id = match group_id {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let mut stmt = conn.prepare("SELECT word FROM word_pairs WHERE group_id = ?")?;
        let rows = stmt.query_map(params![group_id], |row| row.get(0))?;

        let mut related = Vec::new();
        for row in rows {
            related.push(row?);
        }
        Ok(related)
    }

    /// For each original, the first related word present in `options`.
    ///
    /// Greedy and order-dependent: each original is matched independently,
    /// so two originals can claim the same option. The result preserves the
    /// order of `originals`; downstream bounds consumption resolves
    /// first-come precedence.
    pub fn find_matches(
        &self,
        originals: &[String],
        options: &[String],
    ) -> Result<Vec<(String, Option<String>)>> {
        let mut matches = Vec::with_capacity(originals.len());
        for original in originals {
            let related = self.related_words(original)?;
            let hit = related.into_iter().find(|w| options.contains(w));
            matches.push((original.clone(), hit));
        }
        Ok(matches)
    }

    pub fn word_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: usize =
            conn.query_row("SELECT COUNT(*) FROM word_pairs", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> AssociationStore {
        AssociationStore::open_in_memory().unwrap()
    }

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_group_inserts_all() {
        let store = test_store();
        assert_eq!(store.insert_group(&owned(&["cat", "dog"])).unwrap(), 2);
        assert_eq!(store.word_count().unwrap(), 2);

        let related = store.related_words("cat").unwrap();
        assert!(related.contains(&"cat".to_string()));
        assert!(related.contains(&"dog".to_string()));
    }

    #[test]
    fn test_groups_grow_transitively() {
        let store = test_store();
        store.insert_group(&owned(&["cat", "dog"])).unwrap();
        assert_eq!(store.insert_group(&owned(&["dog", "elephant"])).unwrap(), 1);

        let related = store.related_words("cat").unwrap();
        assert!(related.contains(&"elephant".to_string()));
        assert_eq!(related.len(), 3);
    }

    #[test]
    fn test_unchanged_membership_counts_zero() {
        let store = test_store();
        store.insert_group(&owned(&["cat", "dog"])).unwrap();
        assert_eq!(store.insert_group(&owned(&["cat", "dog"])).unwrap(), 0);
        assert_eq!(store.word_count().unwrap(), 2);
    }

    #[test]
    fn test_bridging_reassigns_and_abandons_old_group() {
        let store = test_store();
        store.insert_group(&owned(&["cat", "dog"])).unwrap();
        store.insert_group(&owned(&["elephant", "crane"])).unwrap();

        // "cat" was inserted first, so its group is adopted and "elephant"
        // moves over; "crane" stays behind under the old group.
        assert_eq!(store.insert_group(&owned(&["cat", "elephant"])).unwrap(), 1);

        let related = store.related_words("cat").unwrap();
        assert!(related.contains(&"elephant".to_string()));
        assert!(!related.contains(&"crane".to_string()));

        let orphaned = store.related_words("crane").unwrap();
        assert_eq!(orphaned, vec!["crane".to_string()]);
    }

    #[test]
    fn test_related_words_unknown_word() {
        let store = test_store();
        assert!(store.related_words("nothing").unwrap().is_empty());
    }

    #[test]
    fn test_blank_words_skipped() {
        let store = test_store();
        assert_eq!(store.insert_group(&owned(&["", "  "])).unwrap(), 0);
        assert_eq!(store.insert_group(&owned(&["cat", ""])).unwrap(), 1);
    }

    #[test]
    fn test_find_matches_across_groups() {
        let store = test_store();
        store.insert_group(&owned(&["cat", "dog"])).unwrap();
        store.insert_group(&owned(&["elephant", "crane"])).unwrap();

        let matches = store
            .find_matches(
                &owned(&["cat", "elephant"]),
                &owned(&["dog", "crane", "giraffe"]),
            )
            .unwrap();
        assert_eq!(
            matches,
            vec![
                ("cat".to_string(), Some("dog".to_string())),
                ("elephant".to_string(), Some("crane".to_string())),
            ]
        );
    }

    #[test]
    fn test_find_matches_unmatched_is_none() {
        let store = test_store();
        store.insert_group(&owned(&["cat", "dog"])).unwrap();

        let matches = store
            .find_matches(&owned(&["cat", "bird"]), &owned(&["dog", "crane"]))
            .unwrap();
        assert_eq!(matches[0].1, Some("dog".to_string()));
        assert_eq!(matches[1].1, None);
    }
}
