//! In-memory nested-map backend.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry as MapEntry;
use std::ops::Bound;
use std::sync::RwLock;

use crate::{
    core::key::display_path,
    error::{StorageError, StoreResult},
    types::ROOT_BUCKET,
};

use super::{Backend, BucketTx, Entry};

#[derive(Debug, Clone)]
enum Node {
    Bucket(Bucket),
    Value(Vec<u8>),
}

/// A named container of nested buckets and leaf values.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    children: BTreeMap<Vec<u8>, Node>,
}

impl Bucket {
    fn get(&self, path: &[Vec<u8>]) -> Option<&Bucket> {
        let mut b = self;
        for name in path {
            match b.children.get(name) {
                Some(Node::Bucket(child)) => b = child,
                _ => return None,
            }
        }
        Some(b)
    }

    fn get_mut(&mut self, path: &[Vec<u8>]) -> Option<&mut Bucket> {
        let mut b = self;
        for name in path {
            match b.children.get_mut(name) {
                Some(Node::Bucket(child)) => b = child,
                _ => return None,
            }
        }
        Some(b)
    }

    fn entries(&self, min: Option<&[u8]>, max: Option<&[u8]>) -> Vec<Entry> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Vec::new();
            }
        }
        let lo = min.map_or(Bound::Unbounded, Bound::Included);
        let hi = max.map_or(Bound::Unbounded, Bound::Included);
        self.children
            .range::<[u8], _>((lo, hi))
            .map(|(key, node)| Entry {
                key: key.clone(),
                value: match node {
                    Node::Bucket(_) => None,
                    Node::Value(v) => Some(v.clone()),
                },
            })
            .collect()
    }
}

/// Process-local backend.
///
/// Write transactions change the tree in place under the write lock and
/// keep an undo log; a failed transaction replays it in reverse.
#[derive(Debug)]
pub struct MemoryBackend {
    root: Vec<u8>,
    tree: RwLock<Bucket>,
    read_only: bool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(ROOT_BUCKET)
    }
}

impl MemoryBackend {
    /// Empty store with the root bucket `root` already created.
    pub fn new(root: impl Into<Vec<u8>>) -> Self {
        let root = root.into();
        let mut tree = Bucket::default();
        tree.children
            .insert(root.clone(), Node::Bucket(Bucket::default()));
        Self {
            root,
            tree: RwLock::new(tree),
            read_only: false,
        }
    }

    /// Store without any bucket, not even the root.
    pub fn empty(root: impl Into<Vec<u8>>) -> Self {
        Self {
            root: root.into(),
            tree: RwLock::new(Bucket::default()),
            read_only: false,
        }
    }

    /// Makes every write transaction non-writable.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl Backend for MemoryBackend {
    fn root(&self) -> &[u8] {
        &self.root
    }

    fn view<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn BucketTx) -> StoreResult<T>,
    {
        let tree = self.tree.read().map_err(|_| StorageError::Poisoned)?;
        f(&MemoryTx::Read(&tree))
    }

    fn update<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn BucketTx) -> StoreResult<T>,
    {
        let mut guard = self.tree.write().map_err(|_| StorageError::Poisoned)?;
        let mut tx = MemoryTx::Write {
            tree: &mut *guard,
            writable: !self.read_only,
            undo: Vec::new(),
        };
        match f(&mut tx) {
            Ok(out) => Ok(out),
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }
}

/// Inverse of one change made by a write transaction.
enum Undo {
    Created(Vec<Vec<u8>>),
    Put {
        bucket: Vec<Vec<u8>>,
        key: Vec<u8>,
        previous: Option<Vec<u8>>,
    },
}

enum MemoryTx<'a> {
    Read(&'a Bucket),
    Write {
        tree: &'a mut Bucket,
        writable: bool,
        undo: Vec<Undo>,
    },
}

impl MemoryTx<'_> {
    fn tree(&self) -> &Bucket {
        match self {
            MemoryTx::Read(tree) => *tree,
            MemoryTx::Write { tree, .. } => &**tree,
        }
    }

    fn tree_mut(&mut self, path: &[Vec<u8>]) -> StoreResult<(&mut Bucket, &mut Vec<Undo>)> {
        match self {
            MemoryTx::Write {
                tree,
                writable: true,
                undo,
            } => Ok((&mut **tree, undo)),
            _ => Err(StorageError::NotWritable(display_path(path))),
        }
    }

    fn rollback(&mut self) {
        let MemoryTx::Write { tree, undo, .. } = self else {
            return;
        };
        while let Some(step) = undo.pop() {
            match step {
                Undo::Created(path) => {
                    if let Some((name, parent)) = path.split_last() {
                        if let Some(b) = tree.get_mut(parent) {
                            b.children.remove(name);
                        }
                    }
                }
                Undo::Put {
                    bucket,
                    key,
                    previous,
                } => {
                    if let Some(b) = tree.get_mut(&bucket) {
                        match previous {
                            Some(value) => {
                                b.children.insert(key, Node::Value(value));
                            }
                            None => {
                                b.children.remove(&key);
                            }
                        }
                    }
                }
            }
        }
    }
}

impl BucketTx for MemoryTx<'_> {
    fn writable(&self) -> bool {
        matches!(self, MemoryTx::Write { writable: true, .. })
    }

    fn bucket_exists(&self, path: &[Vec<u8>]) -> StoreResult<bool> {
        Ok(self.tree().get(path).is_some())
    }

    fn create_bucket_if_not_exists(&mut self, path: &[Vec<u8>]) -> StoreResult<()> {
        let Some((name, parent_path)) = path.split_last() else {
            return Ok(());
        };
        let (tree, undo) = self.tree_mut(path)?;
        let parent = tree
            .get_mut(parent_path)
            .ok_or_else(|| StorageError::MissingBucket(display_path(parent_path)))?;
        match parent.children.entry(name.clone()) {
            MapEntry::Occupied(e) => match e.get() {
                Node::Bucket(_) => Ok(()),
                Node::Value(_) => Err(StorageError::IncompatibleValue(display_path(path))),
            },
            MapEntry::Vacant(e) => {
                e.insert(Node::Bucket(Bucket::default()));
                undo.push(Undo::Created(path.to_vec()));
                Ok(())
            }
        }
    }

    fn put(&mut self, bucket: &[Vec<u8>], key: &[u8], value: &[u8]) -> StoreResult<()> {
        let (tree, undo) = self.tree_mut(bucket)?;
        let b = tree
            .get_mut(bucket)
            .ok_or_else(|| StorageError::MissingBucket(display_path(bucket)))?;
        let previous = match b.children.get(key) {
            Some(Node::Bucket(_)) => {
                let mut path = bucket.to_vec();
                path.push(key.to_vec());
                return Err(StorageError::IncompatibleValue(display_path(&path)));
            }
            Some(Node::Value(v)) => Some(v.clone()),
            None => None,
        };
        b.children.insert(key.to_vec(), Node::Value(value.to_vec()));
        undo.push(Undo::Put {
            bucket: bucket.to_vec(),
            key: key.to_vec(),
            previous,
        });
        Ok(())
    }

    fn entries(
        &self,
        bucket: &[Vec<u8>],
        min: Option<&[u8]>,
        max: Option<&[u8]>,
    ) -> StoreResult<Vec<Entry>> {
        Ok(self
            .tree()
            .get(bucket)
            .map(|b| b.entries(min, max))
            .unwrap_or_default())
    }
}
