//! Hierarchical bucket store.
//!
//! Records live at `root/{type}/{YY}/{MM}/{DD}/{hh}/{mm}/{cal_id}`. A range
//! scan first walks down the buckets both bounds share, then scans that
//! subtree: a child equal to a bound segment is scanned with the rest of
//! that bound, a child strictly between the bounds is read whole.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    core::key::{StorageKey, display_path},
    error::{StorageError, StoreResult},
    event::{Event, Events},
    persist::BucketTx,
    types::CalId,
};

/// What a scan does with a leaf that fails to decode or is not valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPolicy {
    /// Skip the record, count it in [`ScanReport`] and keep going.
    #[default]
    SkipInvalid,
    /// Abort the scan with [`StorageError::CorruptRecord`].
    Strict,
}

/// Counters collected while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanReport {
    /// Leaf values visited.
    pub scanned: u64,
    /// Leaves that were not valid JSON events.
    pub malformed: u64,
    /// Leaves that decoded but failed [`Event::is_valid`].
    pub invalid: u64,
}

impl ScanReport {
    /// Leaves left out of the result.
    pub fn skipped(&self) -> u64 {
        self.malformed + self.invalid
    }

    /// Adds `other`'s counters to `self`.
    pub fn merge(&mut self, other: ScanReport) {
        self.scanned += other.scanned;
        self.malformed += other.malformed;
        self.invalid += other.invalid;
    }
}

/// Stores `value` under `cal_id` in the minute bucket named by `key`,
/// creating missing buckets on the way and overwriting a previous value.
pub fn put(
    tx: &mut dyn BucketTx,
    root: &[u8],
    key: &StorageKey,
    cal_id: CalId,
    value: &[u8],
) -> StoreResult<()> {
    let mut path = vec![root.to_vec()];
    if !tx.writable() {
        return Err(StorageError::NotWritable(display_path(&path)));
    }
    if !tx.bucket_exists(&path)? {
        return Err(StorageError::MissingBucket(display_path(&path)));
    }
    for segment in key.segments() {
        path.push(segment.clone());
        tx.create_bucket_if_not_exists(&path)?;
    }
    tx.put(&path, cal_id.to_string().as_bytes(), value)
}

/// Every valid event whose path lies in `[min, max]`, in path order.
///
/// The bounds are not swapped: `min > max` yields nothing.
pub fn range_scan(
    tx: &dyn BucketTx,
    root: &[u8],
    min: &StorageKey,
    max: &StorageKey,
    policy: ScanPolicy,
) -> StoreResult<(Events, ScanReport)> {
    let root_path = vec![root.to_vec()];
    if !tx.bucket_exists(&root_path)? {
        return Err(StorageError::MissingBucket(display_path(&root_path)));
    }

    let (min, max) = (min.segments(), max.segments());
    let Some((mut ancestor, depth)) = descend_to_common_ancestor(tx, root_path, min, max)? else {
        return Ok((Events::new(), ScanReport::default()));
    };

    let mut scan = Scan {
        tx,
        policy,
        events: Events::new(),
        report: ScanReport::default(),
    };
    scan.bucket(&mut ancestor, bound(&min[depth..]), bound(&max[depth..]))?;
    debug!(
        "scanned {} [{} leaves, {} skipped]",
        display_path(&ancestor),
        scan.report.scanned,
        scan.report.skipped()
    );
    Ok((scan.events, scan.report))
}

/// Walks from `path` through the segments `min` and `max` share.
///
/// Returns the deepest shared bucket and how many segments were consumed,
/// or `None` when one of the shared buckets does not exist.
fn descend_to_common_ancestor(
    tx: &dyn BucketTx,
    mut path: Vec<Vec<u8>>,
    min: &[Vec<u8>],
    max: &[Vec<u8>],
) -> StoreResult<Option<(Vec<Vec<u8>>, usize)>> {
    let mut depth = 0;
    for (lo, hi) in min.iter().zip(max) {
        if lo != hi {
            break;
        }
        path.push(lo.clone());
        if !tx.bucket_exists(&path)? {
            return Ok(None);
        }
        depth += 1;
    }
    Ok(Some((path, depth)))
}

fn bound(rest: &[Vec<u8>]) -> Option<&[Vec<u8>]> {
    if rest.is_empty() { None } else { Some(rest) }
}

fn head(limit: Option<&[Vec<u8>]>) -> Option<&[u8]> {
    limit.and_then(|b| b.first()).map(Vec::as_slice)
}

/// Remainder of `limit` below `key`, if `key` sits exactly on it.
fn narrow<'b>(limit: Option<&'b [Vec<u8>]>, key: &[u8]) -> Option<&'b [Vec<u8>]> {
    match limit {
        Some([first, rest @ ..]) if first.as_slice() == key => bound(rest),
        _ => None,
    }
}

struct Scan<'t> {
    tx: &'t dyn BucketTx,
    policy: ScanPolicy,
    events: Events,
    report: ScanReport,
}

impl Scan<'_> {
    fn bucket(
        &mut self,
        path: &mut Vec<Vec<u8>>,
        lo: Option<&[Vec<u8>]>,
        hi: Option<&[Vec<u8>]>,
    ) -> StoreResult<()> {
        let entries = self.tx.entries(path, head(lo), head(hi))?;
        for entry in entries {
            match entry.value {
                None => {
                    let child_lo = narrow(lo, &entry.key);
                    let child_hi = narrow(hi, &entry.key);
                    path.push(entry.key);
                    self.bucket(path, child_lo, child_hi)?;
                    path.pop();
                }
                Some(raw) => self.leaf(path, &entry.key, &raw)?,
            }
        }
        Ok(())
    }

    fn leaf(&mut self, path: &[Vec<u8>], key: &[u8], raw: &[u8]) -> StoreResult<()> {
        self.report.scanned += 1;
        let reason = match serde_json::from_slice::<Event>(raw) {
            Ok(event) if event.is_valid() => {
                self.events.push(event);
                return Ok(());
            }
            Ok(_) => {
                self.report.invalid += 1;
                "not a valid event".to_string()
            }
            Err(err) => {
                self.report.malformed += 1;
                err.to_string()
            }
        };

        let mut full = path.to_vec();
        full.push(key.to_vec());
        let key = display_path(&full);
        match self.policy {
            ScanPolicy::Strict => Err(StorageError::CorruptRecord { key, reason }),
            ScanPolicy::SkipInvalid => {
                debug!("skipping {key}: {reason}");
                Ok(())
            }
        }
    }
}
