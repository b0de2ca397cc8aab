//! Backend abstraction over nested-bucket key-value storage, plus the
//! in-memory and SQLite implementations.

pub mod memory;
pub mod sqlite;

use crate::error::StoreResult;

/// One child of a bucket, as seen by a cursor.
///
/// `value` is `None` when the key names a nested bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Child name.
    pub key: Vec<u8>,
    /// Leaf payload, or `None` for a nested bucket.
    pub value: Option<Vec<u8>>,
}

impl Entry {
    /// True when this entry names a nested bucket.
    pub fn is_bucket(&self) -> bool {
        self.value.is_none()
    }
}

/// Operations available inside a single transaction.
///
/// Bucket paths are given as the list of bucket names from the top level
/// down; the root bucket is itself the first name.
pub trait BucketTx {
    /// False for read transactions and read-only backends.
    fn writable(&self) -> bool;

    /// True when `path` names an existing bucket.
    fn bucket_exists(&self, path: &[Vec<u8>]) -> StoreResult<bool>;

    /// Creates the bucket at `path`; its parent must exist.
    fn create_bucket_if_not_exists(&mut self, path: &[Vec<u8>]) -> StoreResult<()>;

    /// Inserts or overwrites the leaf `key` in the bucket at `bucket`.
    fn put(&mut self, bucket: &[Vec<u8>], key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Children of `bucket` with `min <= key <= max`, in byte order.
    ///
    /// A missing bound is open on that side; a missing bucket has no children.
    fn entries(
        &self,
        bucket: &[Vec<u8>],
        min: Option<&[u8]>,
        max: Option<&[u8]>,
    ) -> StoreResult<Vec<Entry>>;
}

/// Transactional nested-bucket storage.
///
/// `view` runs `f` in a read transaction, `update` in a write transaction
/// that is committed only if `f` succeeds.
pub trait Backend: Send + Sync {
    /// Name of the bucket every partition lives under.
    fn root(&self) -> &[u8];

    /// Runs `f` in a read transaction.
    fn view<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn BucketTx) -> StoreResult<T>;

    /// Runs `f` in a write transaction.
    fn update<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn BucketTx) -> StoreResult<T>;
}
