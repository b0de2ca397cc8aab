//! Storage and configuration error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::CalId;

/// Errors surfaced by backends, the bucket store and the repository.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file could not be opened.
    #[error("could not open store {path:?}: {source}")]
    Open {
        /// Database file path.
        path: PathBuf,
        /// Underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Any other SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Record (de)serialization failed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A write was attempted through a read-only transaction.
    #[error("non writeable bucket {0}")]
    NotWritable(String),

    /// A bucket required by the operation does not exist.
    #[error("invalid bucket {0}")]
    MissingBucket(String),

    /// A path segment names a value where a bucket was expected, or the reverse.
    #[error("incompatible value at {0}")]
    IncompatibleValue(String),

    /// The event type cannot be used as a bucket name.
    #[error("invalid event type {0:?}")]
    InvalidType(String),

    /// The event fails [`crate::event::Event::is_valid`] and cannot be keyed.
    #[error("event {0} is not valid")]
    InvalidEvent(CalId),

    /// A leaf record failed to decode or validate during a strict scan.
    #[error("corrupt record {key}: {reason}")]
    CorruptRecord {
        /// Full path of the offending leaf.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An in-memory lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StorageError>;

/// Errors raised while loading a [`crate::config::RepositoryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("could not read config {path:?}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
