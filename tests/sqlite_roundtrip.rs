use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tempfile::TempDir;

use calstore::{
    config::RepositoryConfig,
    core::{
        key::StorageKey,
        store::{self, ScanPolicy, ScanReport},
    },
    cursor::DateCursor,
    error::StorageError,
    event::Event,
    persist::{Backend, sqlite::SqliteBackend},
    repository::Repository,
    types::CalId,
};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn event(id: CalId, typ: &str, start: DateTime<Utc>) -> Event {
    Event {
        cal_id: id,
        start_time: Some(start),
        duration: TimeDelta::minutes(150),
        event_type: typ.to_string(),
        category: "ESL Pro League".to_string(),
        stage: "Group A".to_string(),
        links: vec!["https://example.org/a".to_string(), "https://example.org/b".to_string()],
        ..Event::default()
    }
}

fn ids(events: &calstore::event::Events) -> Vec<CalId> {
    events.iter().map(|e| e.cal_id).collect()
}

#[test]
fn day_windows_return_only_their_events_in_order() {
    let tmp = TempDir::new().expect("tmp");
    let repo = Repository::open(&RepositoryConfig::at(tmp.path().join("cal.db")));

    // saved out of order on purpose
    repo.save_events(&[
        event(3, "qlv", at(2024, 1, 2, 9, 0)),
        event(2, "qlv", at(2024, 1, 1, 10, 30)),
        event(1, "qlv", at(2024, 1, 1, 10, 0)),
    ])
    .expect("save");

    let jan1 = repo
        .load_events(DateCursor::new(at(2024, 1, 1, 0, 0), TimeDelta::hours(24)), &["qlv"])
        .expect("load jan 1");
    assert_eq!(ids(&jan1), [1, 2]);

    let jan2 = repo
        .load_events(DateCursor::new(at(2024, 1, 2, 0, 0), TimeDelta::hours(24)), &["qlv"])
        .expect("load jan 2");
    assert_eq!(ids(&jan2), [3]);
}

#[test]
fn round_trip_survives_reopen() {
    let tmp = TempDir::new().expect("tmp");
    let cfg = RepositoryConfig::at(tmp.path().join("cal.db"));
    let mut original = event(7, "sc2", at(2024, 3, 9, 17, 45));
    original.content = "Serral vs Clem".to_string();
    original.canceled = true;
    original.match_count = 3;
    original.duration = TimeDelta::milliseconds(5_400_250);

    Repository::open(&cfg).save_event(&original).expect("save");

    let reopened = Repository::open(&cfg);
    let mut loaded = reopened.load_event("sc2", at(2024, 3, 9, 17, 45), 7);
    assert_eq!(loaded, original);
    assert_eq!(loaded.content, "Serral vs Clem");
    assert_eq!(loaded.duration, TimeDelta::milliseconds(5_400_250));
    assert!(loaded.canceled);

    loaded.links.reverse();
    assert!(loaded.equals(&original));
}

#[test]
fn second_save_overwrites_the_first() {
    let tmp = TempDir::new().expect("tmp");
    let repo = Repository::open(&RepositoryConfig::at(tmp.path().join("cal.db")));
    let start = at(2024, 5, 20, 14, 0);

    let mut first = event(5, "tl", start);
    first.content = "first".to_string();
    let mut second = first.clone();
    second.content = "second".to_string();
    repo.save_event(&first).expect("save first");
    repo.save_event(&second).expect("save second");

    assert_eq!(repo.load_event("tl", start, 5).content, "second");

    let key = StorageKey::new("tl", start).expect("key");
    let mut bucket = vec![repo.backend().root().to_vec()];
    bucket.extend(key.segments().iter().cloned());
    let entries = repo
        .backend()
        .view(|tx| tx.entries(&bucket, None, None))
        .expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, b"5".to_vec());
}

#[test]
fn corrupt_leaf_does_not_hide_its_neighbours() {
    let tmp = TempDir::new().expect("tmp");
    let repo = Repository::open(&RepositoryConfig::at(tmp.path().join("cal.db")));
    let start = at(2024, 1, 1, 10, 0);
    repo.save_event(&event(1, "qlv", start)).expect("save");
    repo.save_event(&event(2, "qlv", start + TimeDelta::minutes(1))).expect("save");

    let backend = repo.backend();
    let key = StorageKey::new("qlv", start).expect("key");
    backend
        .update(|tx| store::put(tx, backend.root(), &key, 9, b"\x00garbage"))
        .expect("inject");

    let (events, report) = repo
        .load_events_with_report(DateCursor::new(start, TimeDelta::hours(1)), &["qlv"])
        .expect("load");
    assert_eq!(ids(&events), [1, 2]);
    assert_eq!(report.scanned, 3);
    assert_eq!(report.malformed, 1);
    assert_eq!(repo.skipped_records(), 1);
}

#[test]
fn decodable_but_invalid_leaf_is_skipped_or_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("cal.db");
    let repo = Repository::open(&RepositoryConfig::at(&path));
    let start = at(2024, 1, 1, 10, 0);
    repo.save_event(&event(1, "qlv", start)).expect("save");
    repo.save_event(&event(2, "qlv", start + TimeDelta::minutes(5))).expect("save");

    let backend = repo.backend();
    let key = StorageKey::new("qlv", start).expect("key");
    backend
        .update(|tx| store::put(tx, backend.root(), &key, 3, br#"{"cal_id":0,"type":"qlv"}"#))
        .expect("inject");

    let cursor = DateCursor::new(start, TimeDelta::hours(1));
    let (events, report) = repo
        .load_events_with_report(cursor, &["qlv"])
        .expect("load");
    assert_eq!(ids(&events), [1, 2]);
    assert_eq!(report, ScanReport { scanned: 3, malformed: 0, invalid: 1 });

    let strict = Repository::with_backend(SqliteBackend::new(&path), ScanPolicy::Strict);
    match strict.load_events(cursor, &["qlv"]) {
        Err(StorageError::CorruptRecord { key, .. }) => assert!(key.ends_with("qlv/24/01/01/10/00/3")),
        other => panic!("expected corrupt record, got {other:?}"),
    }
}

#[test]
fn reads_do_not_wait_for_a_writer() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("cal.db");
    let repo = Repository::open(&RepositoryConfig::at(&path));
    let start = at(2024, 7, 7, 7, 0);
    repo.save_event(&event(1, "sc2", start)).expect("save");

    let writer = rusqlite::Connection::open(&path).expect("open writer");
    writer.execute_batch("BEGIN IMMEDIATE").expect("lock");

    let started = std::time::Instant::now();
    assert_eq!(repo.load_event("sc2", start, 1).cal_id, 1);
    assert!(started.elapsed() < std::time::Duration::from_secs(2));

    writer.execute_batch("ROLLBACK").expect("unlock");
}

#[test]
fn read_only_repository_loads_but_cannot_save() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("cal.db");
    let start = at(2024, 8, 1, 20, 0);
    Repository::open(&RepositoryConfig::at(&path))
        .save_event(&event(1, "dota", start))
        .expect("seed");

    let cfg = RepositoryConfig {
        read_only: true,
        ..RepositoryConfig::at(&path)
    };
    let ro = Repository::open(&cfg);
    assert_eq!(ro.load_event("dota", start, 1).cal_id, 1);
    assert!(matches!(
        ro.save_event(&event(2, "dota", start)),
        Err(StorageError::NotWritable(_))
    ));
}

#[test]
fn custom_root_bucket_is_isolated() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("cal.db");
    let start = at(2024, 4, 4, 4, 4);

    let cycling = SqliteBackend::new(&path).with_root("gcn");
    let repo = Repository::with_backend(cycling, Default::default());
    repo.save_event(&event(1, "road", start)).expect("save");

    let default_root = Repository::open(&RepositoryConfig::at(&path));
    assert!(!default_root.load_event("road", start, 1).is_valid());
    assert!(repo.load_event("road", start, 1).is_valid());
}
