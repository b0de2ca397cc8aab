//! Repository configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    core::store::ScanPolicy,
    error::ConfigError,
    types::{DEFAULT_FILE, ROOT_BUCKET},
};

/// Everything a [`crate::repository::Repository`] needs to open its store.
///
/// Missing keys fall back to [`RepositoryConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Database file.
    pub path: PathBuf,
    /// Top-level bucket name.
    pub root_bucket: String,
    /// Open the file read-only; every save fails.
    pub read_only: bool,
    /// Handling of undecodable or invalid records during scans.
    pub scan_policy: ScanPolicy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_FILE),
            root_bucket: ROOT_BUCKET.to_string(),
            read_only: false,
            scan_policy: ScanPolicy::SkipInvalid,
        }
    }
}

impl RepositoryConfig {
    /// Default config pointing at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parses a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}
