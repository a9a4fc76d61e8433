//! Kotoba Control - CLI for the association store
//!
//! Bulk-imports scraped session files into the sentence-pair and word-group
//! tables and provides simple store inspection commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use kotoba_core::session::{persist, process_session, Extracted};
use kotoba_core::{AssociationStore, Config};

#[derive(Parser)]
#[command(name = "kotobactl")]
#[command(about = "Kotoba - answer-association store tooling", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file path (defaults to ~/.config/kotoba/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import scraped session JSON files into the store
    Import {
        /// Session files, or directories to scan for *.json
        paths: Vec<PathBuf>,

        /// Parse and report only, write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show store counts
    Stats,

    /// Substring search over stored sentence pairs
    Find {
        query: String,
    },

    /// List words related to a word
    Related {
        word: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let store = AssociationStore::open(config.database_path())?;

    match cli.command {
        Commands::Import { paths, dry_run } => import(&store, &paths, dry_run),
        Commands::Stats => stats(&store),
        Commands::Find { query } => find(&store, &query),
        Commands::Related { word } => related(&store, &word),
    }
}

fn import(store: &AssociationStore, paths: &[PathBuf], dry_run: bool) -> Result<()> {
    let files = collect_session_files(paths);
    if files.is_empty() {
        println!("No session files found.");
        return Ok(());
    }
    info!(count = files.len(), "Parsing session files");

    // One worker per file; files are independent, results are merged and
    // deduplicated only after every worker has finished.
    let results: Vec<Result<Extracted>> = std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|file| scope.spawn(move || parse_session_file(file)))
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("session worker panicked")))
            })
            .collect()
    });

    let mut merged = Extracted::default();
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(extracted) => merged.merge(extracted),
            Err(e) => warn!(file = %file.display(), error = %e, "Failed to parse session file"),
        }
    }
    merged.dedup();

    println!(
        "Extracted {} sentence pairs and {} word pairs from {} files",
        merged.sentence_pairs.len(),
        merged.word_pairs.len(),
        files.len()
    );

    if dry_run {
        println!("Dry run, nothing written.");
        return Ok(());
    }

    let summary = persist(store, &merged)?;
    println!(
        "SENTENCE_TRANSLATION: {} written / {} extracted",
        summary.sentence_written, summary.sentence_total
    );
    println!(
        "WORD_PAIR: {} written / {} extracted",
        summary.word_written, summary.word_total
    );
    Ok(())
}

fn parse_session_file(path: &Path) -> Result<Extracted> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file: {:?}", path))?;
    let data: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse session file: {:?}", path))?;
    Ok(process_session(&data))
}

/// Expand files and directories into the list of .json session files.
fn collect_session_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.extension().map(|e| e == "json").unwrap_or(false) {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn stats(store: &AssociationStore) -> Result<()> {
    println!("Sentence pairs: {}", store.sentence_count()?);
    println!("Word rows:      {}", store.word_count()?);
    Ok(())
}

fn find(store: &AssociationStore, query: &str) -> Result<()> {
    let pairs = store.find_pairs(query)?;
    if pairs.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    for (original, translated) in pairs {
        println!("{}  =>  {}", original, translated);
    }
    Ok(())
}

fn related(store: &AssociationStore, word: &str) -> Result<()> {
    let words = store.related_words(word)?;
    if words.is_empty() {
        println!("No related words.");
        return Ok(());
    }
    for w in words {
        println!("{}", w);
    }
    Ok(())
}
