//! Configuration for the resolver and its tooling.
//!
//! Config file: ~/.config/kotoba/config.toml, TOML with per-section
//! defaults; a missing file yields the full default configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::oracle::OracleConfig;
use crate::store::AssociationStore;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub oracle: OracleConfig,
    pub resolver: ResolverConfig,
}

/// Association store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path; the platform data dir is used when unset.
    pub path: Option<PathBuf>,
}

/// Resolver behavior toggles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Bind matching pairs positionally instead of inferring; used for
    /// timed drills where speed beats correctness.
    pub timed_pairs: bool,
}

impl Config {
    /// Load from `path`, or from the default location when `None`. A
    /// missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("kotoba")
            .join("config.toml")
    }

    /// Effective database path.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(AssociationStore::default_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.database.path.is_none());
        assert!(!config.resolver.timed_pairs);
        assert_eq!(config.oracle.max_attempts, 3);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config.oracle.timeout_secs, 30);
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[oracle]\nmodel = \"glm-4\"\n\n[resolver]\ntimed_pairs = true"
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.oracle.model, "glm-4");
        assert_eq!(config.oracle.max_attempts, 3);
        assert!(config.resolver.timed_pairs);
        assert!(config.database.path.is_none());
    }
}
