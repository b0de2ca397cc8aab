//! SQLite single-file backend.
//!
//! The database file is opened for every transaction and closed afterwards;
//! isolation between callers is SQLite's own (one writer, many readers).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use log::debug;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior, params};

use crate::{
    core::key::{display_path, join_path},
    error::{StorageError, StoreResult},
    types::ROOT_BUCKET,
};

use super::{Backend, BucketTx, Entry};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite implementation of [`crate::persist::Backend`].
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
    root: Vec<u8>,
    read_only: bool,
    initialized: OnceLock<()>,
}

impl SqliteBackend {
    /// Backend for the file at `path` with the default root bucket.
    ///
    /// Nothing is opened until the first transaction.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            root: ROOT_BUCKET.as_bytes().to_vec(),
            read_only: false,
            initialized: OnceLock::new(),
        }
    }

    /// Overrides the root bucket name.
    pub fn with_root(mut self, root: impl Into<Vec<u8>>) -> Self {
        self.root = root.into();
        self.initialized = OnceLock::new();
        self
    }

    /// Opens the file read-only; write transactions become non-writable.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Database file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file; the first writable open also creates the schema
    /// and the root bucket.
    fn connect(&self) -> StoreResult<Connection> {
        let flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        let conn = Connection::open_with_flags(&self.path, flags).map_err(|source| {
            StorageError::Open {
                path: self.path.clone(),
                source,
            }
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        if !self.read_only {
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            if self.initialized.get().is_none() {
                self.init_schema(&conn)?;
                let _ = self.initialized.set(());
            }
        }
        debug!("opened {:?} (read_only={})", self.path, self.read_only);
        Ok(conn)
    }

    fn init_schema(&self, conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute(
            "INSERT OR IGNORE INTO buckets(parent, name, value) VALUES (?1, ?2, NULL)",
            params![&b""[..], &self.root],
        )?;
        debug!("initialized {:?} with root {}", self.path, display_path(&[&self.root]));
        Ok(())
    }
}

fn close(conn: Connection) -> StoreResult<()> {
    conn.close().map_err(|(_, err)| StorageError::Sqlite(err))
}

impl Backend for SqliteBackend {
    fn root(&self) -> &[u8] {
        &self.root
    }

    fn view<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn BucketTx) -> StoreResult<T>,
    {
        let mut conn = self.connect()?;
        let out = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(StorageError::from)
            .and_then(|tx| {
                f(&SqliteTx {
                    tx,
                    writable: false,
                })
            });
        let closed = close(conn);
        let out = out?;
        closed?;
        Ok(out)
    }

    fn update<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn BucketTx) -> StoreResult<T>,
    {
        let behavior = if self.read_only {
            TransactionBehavior::Deferred
        } else {
            TransactionBehavior::Immediate
        };
        let mut conn = self.connect()?;
        let out = conn
            .transaction_with_behavior(behavior)
            .map_err(StorageError::from)
            .and_then(|tx| {
                let mut stx = SqliteTx {
                    tx,
                    writable: !self.read_only,
                };
                let out = f(&mut stx)?;
                stx.tx.commit()?;
                Ok(out)
            });
        let closed = close(conn);
        let out = out?;
        closed?;
        Ok(out)
    }
}

struct SqliteTx<'c> {
    tx: Transaction<'c>,
    writable: bool,
}

impl SqliteTx<'_> {
    /// `Some(true)` for a bucket, `Some(false)` for a leaf, `None` if absent.
    fn node_is_bucket(&self, parent: &[Vec<u8>], name: &[u8]) -> StoreResult<Option<bool>> {
        let mut stmt = self
            .tx
            .prepare_cached("SELECT value IS NULL FROM buckets WHERE parent = ?1 AND name = ?2")?;
        let kind = stmt
            .query_row(params![join_path(parent), name], |row| row.get::<_, bool>(0))
            .optional()?;
        Ok(kind)
    }

    fn ensure_writable(&self, path: &[Vec<u8>]) -> StoreResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StorageError::NotWritable(display_path(path)))
        }
    }
}

impl BucketTx for SqliteTx<'_> {
    fn writable(&self) -> bool {
        self.writable
    }

    fn bucket_exists(&self, path: &[Vec<u8>]) -> StoreResult<bool> {
        match path.split_last() {
            None => Ok(true),
            Some((name, parent)) => Ok(self.node_is_bucket(parent, name)? == Some(true)),
        }
    }

    fn create_bucket_if_not_exists(&mut self, path: &[Vec<u8>]) -> StoreResult<()> {
        self.ensure_writable(path)?;
        let Some((name, parent)) = path.split_last() else {
            return Ok(());
        };
        if !self.bucket_exists(parent)? {
            return Err(StorageError::MissingBucket(display_path(parent)));
        }
        match self.node_is_bucket(parent, name)? {
            Some(true) => Ok(()),
            Some(false) => Err(StorageError::IncompatibleValue(display_path(path))),
            None => {
                self.tx
                    .prepare_cached("INSERT INTO buckets(parent, name, value) VALUES (?1, ?2, NULL)")?
                    .execute(params![join_path(parent), name])?;
                Ok(())
            }
        }
    }

    fn put(&mut self, bucket: &[Vec<u8>], key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.ensure_writable(bucket)?;
        if !self.bucket_exists(bucket)? {
            return Err(StorageError::MissingBucket(display_path(bucket)));
        }
        if self.node_is_bucket(bucket, key)? == Some(true) {
            let mut path = bucket.to_vec();
            path.push(key.to_vec());
            return Err(StorageError::IncompatibleValue(display_path(&path)));
        }
        self.tx
            .prepare_cached(
                "INSERT INTO buckets(parent, name, value) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(parent, name) DO UPDATE SET value = excluded.value",
            )?
            .execute(params![join_path(bucket), key, value])?;
        Ok(())
    }

    fn entries(
        &self,
        bucket: &[Vec<u8>],
        min: Option<&[u8]>,
        max: Option<&[u8]>,
    ) -> StoreResult<Vec<Entry>> {
        let mut stmt = self.tx.prepare_cached(
            "SELECT name, value FROM buckets \
             WHERE parent = ?1 AND (?2 IS NULL OR name >= ?2) AND (?3 IS NULL OR name <= ?3) \
             ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![join_path(bucket), min, max], |row| {
            Ok(Entry {
                key: row.get(0)?,
                value: row.get(1)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
