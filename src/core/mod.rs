//! Storage keys and the hierarchical bucket store.

/// Time-partitioned storage paths.
pub mod key;
/// Keyed insert and bounded range scan over nested buckets.
pub mod store;
