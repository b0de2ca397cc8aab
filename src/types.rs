//! Shared primitive IDs and constants.

/// Per-type event identifier, also the leaf key inside a minute bucket.
pub type CalId = i64;

/// Name of the top-level bucket every partition lives under.
pub const ROOT_BUCKET: &str = "cal";

/// Default database file name.
pub const DEFAULT_FILE: &str = "calendar.db";

/// Separator joining bucket names into a storage path.
pub const PATH_SEPARATOR: u8 = b'/';
