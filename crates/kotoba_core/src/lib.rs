//! Kotoba Core - answer-resolution engine for language-drill questions
//!
//! Takes a parsed screen snapshot (question text + tappable options with
//! pixel bounds), decides which options to tap and in what order, and learns
//! confirmed translations into a local store so the oracle is consulted less
//! over time.

pub mod config;
pub mod geometry;
pub mod oracle;
pub mod question;
pub mod resolver;
pub mod segment;
pub mod session;
pub mod store;
pub mod tasks;
pub mod text;

pub use config::Config;
pub use geometry::Bounds;
pub use oracle::{HttpOracle, Oracle, OracleConfig};
pub use question::{Candidate, QuestionKind, Snapshot};
pub use resolver::{AnswerOutcome, AnswerResolver};
pub use store::AssociationStore;
