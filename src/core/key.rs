//! Storage paths: `{type}/{YY}/{MM}/{DD}/{hh}/{mm}`.
//!
//! Every time segment is a two digit zero-padded number computed in UTC, so
//! byte order of two paths with the same type matches chronological order
//! inside one century.

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::{
    error::{StorageError, StoreResult},
    types::PATH_SEPARATOR,
};

/// Number of segments in a full path (type plus five time levels).
pub const PATH_DEPTH: usize = 6;

/// Bucket path of the minute bucket an event lives in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey {
    segments: Vec<Vec<u8>>,
}

impl StorageKey {
    /// Path for `event_type` at `instant`.
    pub fn new(event_type: &str, instant: DateTime<Utc>) -> StoreResult<Self> {
        validate_type(event_type)?;
        let two = |n: u32| format!("{n:02}").into_bytes();
        let year = instant.year().rem_euclid(100) as u32;
        Ok(Self {
            segments: vec![
                event_type.as_bytes().to_vec(),
                two(year),
                two(instant.month()),
                two(instant.day()),
                two(instant.hour()),
                two(instant.minute()),
            ],
        })
    }

    /// Rebuilds a key from a `/`-joined path.
    pub fn parse(path: &[u8]) -> Self {
        Self {
            segments: split_path(path),
        }
    }

    /// Bucket names from the type down to the minute.
    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    /// Partition name.
    pub fn event_type(&self) -> &[u8] {
        self.segments.first().map(Vec::as_slice).unwrap_or_default()
    }

    /// `/`-joined byte path; sortable range boundary.
    pub fn to_path(&self) -> Vec<u8> {
        join_path(&self.segments)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_path()))
    }
}

/// Types become bucket names: non-empty, no separator.
pub fn validate_type(event_type: &str) -> StoreResult<()> {
    if event_type.is_empty() || event_type.as_bytes().contains(&PATH_SEPARATOR) {
        return Err(StorageError::InvalidType(event_type.to_string()));
    }
    Ok(())
}

/// Joins bucket names with [`PATH_SEPARATOR`].
pub fn join_path<S: AsRef<[u8]>>(segments: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(PATH_SEPARATOR);
        }
        out.extend_from_slice(segment.as_ref());
    }
    out
}

/// Splits a joined path; empty input yields no segments.
pub fn split_path(path: &[u8]) -> Vec<Vec<u8>> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split(|b| *b == PATH_SEPARATOR)
        .map(<[u8]>::to_vec)
        .collect()
}

/// Lossy display form of a bucket path, for errors and logs.
pub fn display_path<S: AsRef<[u8]>>(segments: &[S]) -> String {
    String::from_utf8_lossy(&join_path(segments)).into_owned()
}
