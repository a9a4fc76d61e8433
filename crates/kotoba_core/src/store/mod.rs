//! Association store: SQLite-backed sentence-pair and word-group tables.
//!
//! The local, free alternative to the oracle. Two logical tables share one
//! database file: `sentence_pairs` for approximate sentence-translation
//! lookup and `word_pairs` for transitive word relations keyed by group id.

pub mod sentence;
pub mod word;

pub use sentence::{PairSource, SentencePair};

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Handle to both association tables.
///
/// Opened once per session and passed by reference to the resolver; cheap to
/// clone (shared connection).
#[derive(Clone)]
pub struct AssociationStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl AssociationStore {
    /// Open or create the store at the default location.
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path())
    }

    /// Open or create the store at a specific path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        };

        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: PathBuf::from(":memory:"),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Default database location under the user data dir.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("kotoba")
            .join("associations.db")
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sentence_pairs (
                id INTEGER PRIMARY KEY,
                original TEXT NOT NULL,
                translated TEXT NOT NULL,
                source TEXT
            )
            "#,
            [],
        )?;

        // Both columns are searched with LIKE; index both.
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sentence_original ON sentence_pairs(original)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sentence_translated ON sentence_pairs(translated)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS word_pairs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word TEXT NOT NULL,
                group_id TEXT
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_word_pairs_word ON word_pairs(word)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_word_pairs_group ON word_pairs(group_id)",
            [],
        )?;

        Ok(())
    }
}
