//! Typed facade over a bucket backend.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, error, warn};

use crate::{
    config::RepositoryConfig,
    core::{
        key::StorageKey,
        store::{self, ScanPolicy, ScanReport},
    },
    cursor::DateCursor,
    error::{StorageError, StoreResult},
    event::{Event, Events},
    persist::{Backend, memory::MemoryBackend, sqlite::SqliteBackend},
    types::CalId,
};

/// Width in minutes of the window [`Repository::load_event`] searches,
/// centered on the date.
pub const LOOKUP_WINDOW_MINUTES: i64 = 60;

/// Outcome of [`Repository::sync_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Events written because they were new or changed.
    pub saved: usize,
    /// Events already stored with equal content.
    pub unchanged: usize,
    /// Events that could not be written.
    pub failed: usize,
}

/// Event repository: saves events into, and loads them back out of, the
/// time-partitioned bucket store.
#[derive(Debug)]
pub struct Repository<B: Backend = SqliteBackend> {
    backend: B,
    scan_policy: ScanPolicy,
    skipped: AtomicU64,
}

impl Repository<SqliteBackend> {
    /// Repository on the SQLite file named by `config`.
    ///
    /// The file is opened per operation, not here.
    pub fn open(config: &RepositoryConfig) -> Self {
        let backend = SqliteBackend::new(&config.path)
            .with_root(config.root_bucket.as_bytes())
            .with_read_only(config.read_only);
        Self::with_backend(backend, config.scan_policy)
    }
}

impl Repository<MemoryBackend> {
    /// Repository kept in process memory; `config.path` is ignored.
    pub fn in_memory(config: &RepositoryConfig) -> Self {
        let backend = MemoryBackend::new(config.root_bucket.as_bytes())
            .with_read_only(config.read_only);
        Self::with_backend(backend, config.scan_policy)
    }
}

impl<B: Backend> Repository<B> {
    /// Wraps an existing backend.
    pub fn with_backend(backend: B, scan_policy: ScanPolicy) -> Self {
        Self {
            backend,
            scan_policy,
            skipped: AtomicU64::new(0),
        }
    }

    /// Underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Records skipped by scans since this repository was created.
    pub fn skipped_records(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Upserts `event` under its type, start minute and id.
    pub fn save_event(&self, event: &Event) -> StoreResult<()> {
        let Some(start) = event.start_time.filter(|_| event.is_valid()) else {
            return Err(StorageError::InvalidEvent(event.cal_id));
        };
        let key = StorageKey::new(&event.event_type, start)?;
        let raw = serde_json::to_vec(event)?;
        let root = self.backend.root();
        self.backend
            .update(|tx| store::put(tx, root, &key, event.cal_id, &raw))?;
        debug!("saved {key}/{}", event.cal_id);
        Ok(())
    }

    /// Saves each event independently.
    ///
    /// Failures are logged and do not stop the batch; the last one is returned.
    pub fn save_events(&self, events: &[Event]) -> StoreResult<()> {
        let mut last_err = None;
        for event in events {
            if let Err(err) = self.save_event(event) {
                error!("error saving event {}: {err}", event.cal_id);
                last_err = Some(err);
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    /// Events of the given types inside `cursor`, type by type.
    ///
    /// Within one type the result is chronological. No types or no data
    /// gives an empty collection; a type that cannot name a bucket is
    /// skipped with a warning.
    pub fn load_events<S: AsRef<str>>(&self, cursor: DateCursor, types: &[S]) -> StoreResult<Events> {
        self.load_events_with_report(cursor, types)
            .map(|(events, _)| events)
    }

    /// [`Repository::load_events`] plus the scan counters.
    pub fn load_events_with_report<S: AsRef<str>>(
        &self,
        cursor: DateCursor,
        types: &[S],
    ) -> StoreResult<(Events, ScanReport)> {
        let (from, to) = cursor.bounds();
        let mut ranges = Vec::with_capacity(types.len());
        for typ in types {
            let typ = typ.as_ref();
            match (StorageKey::new(typ, from), StorageKey::new(typ, to)) {
                (Ok(min), Ok(max)) => ranges.push((min, max)),
                (Err(err), _) | (_, Err(err)) => warn!("skipping type: {err}"),
            }
        }
        if ranges.is_empty() {
            return Ok((Events::new(), ScanReport::default()));
        }

        let root = self.backend.root();
        let policy = self.scan_policy;
        let (events, report) = self.backend.view(|tx| {
            let mut events = Events::new();
            let mut report = ScanReport::default();
            for (min, max) in &ranges {
                let (found, scanned) = store::range_scan(tx, root, min, max, policy)?;
                events.extend(found);
                report.merge(scanned);
            }
            Ok((events, report))
        })?;

        if report.skipped() > 0 {
            self.skipped.fetch_add(report.skipped(), Ordering::Relaxed);
            warn!(
                "skipped {} of {} stored records ({} malformed, {} invalid)",
                report.skipped(),
                report.scanned,
                report.malformed,
                report.invalid
            );
        }
        Ok((events, report))
    }

    /// Stored event of `typ` with `id` starting near `date`.
    ///
    /// Searches [`LOOKUP_WINDOW_MINUTES`] centered on `date`. A miss, or a
    /// failed load, returns the invalid `Event::default()`.
    pub fn load_event(&self, typ: &str, date: DateTime<Utc>, id: CalId) -> Event {
        let half = TimeDelta::minutes(LOOKUP_WINDOW_MINUTES / 2);
        let from = date.checked_sub_signed(half).unwrap_or(date);
        let cursor = DateCursor::new(from, TimeDelta::minutes(LOOKUP_WINDOW_MINUTES));
        match self.load_events(cursor, &[typ]) {
            Ok(events) => events
                .into_iter()
                .find(|e| e.cal_id == id)
                .unwrap_or_default(),
            Err(err) => {
                error!("error loading events: {err}");
                Event::default()
            }
        }
    }

    /// Saves only the events that are new or differ from the stored copy.
    pub fn sync_events(&self, events: &[Event]) -> SyncReport {
        let mut report = SyncReport::default();
        for event in events {
            if let Some(start) = event.start_time {
                let stored = self.load_event(&event.event_type, start, event.cal_id);
                if stored.is_valid() && stored.equals(event) {
                    report.unchanged += 1;
                    continue;
                }
            }
            match self.save_event(event) {
                Ok(()) => report.saved += 1,
                Err(err) => {
                    error!("error saving event {}: {err}", event.cal_id);
                    report.failed += 1;
                }
            }
        }
        debug!(
            "sync: {} saved, {} unchanged, {} failed",
            report.saved, report.unchanged, report.failed
        );
        report
    }
}
