use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;

use calstore::{
    config::RepositoryConfig,
    core::key::StorageKey,
    cursor::DateCursor,
    event::Event,
    persist::memory::MemoryBackend,
    repository::Repository,
    types::CalId,
};

const TYPES: [&str; 3] = ["qlv", "sc2", "road"];

// 2000-01-01T00:00:00Z .. 2099-12-31T23:59:59Z
const CENTURY_START: i64 = 946_684_800;
const CENTURY_END: i64 = 4_102_444_799;

fn instant(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 31, 22, 0, 0).unwrap()
}

fn event(id: CalId, typ: &str, start: DateTime<Utc>) -> Event {
    Event {
        cal_id: id,
        start_time: Some(start),
        duration: TimeDelta::minutes(30),
        event_type: typ.to_string(),
        ..Event::default()
    }
}

/// Offsets in minutes from `base()`, spanning a year boundary so every
/// bucket level is crossed.
fn saved_strategy() -> impl Strategy<Value = Vec<(usize, i64)>> {
    prop::collection::vec((0usize..TYPES.len(), 0i64..6 * 60), 1..60)
}

fn seeded(saved: &[(usize, i64)]) -> (Repository<MemoryBackend>, Vec<Event>) {
    let repo = Repository::in_memory(&RepositoryConfig::default());
    let mut events = Vec::new();
    for (i, (typ, offset)) in saved.iter().enumerate() {
        let e = event(i as CalId + 1, TYPES[*typ], base() + TimeDelta::minutes(*offset));
        repo.save_event(&e).expect("save");
        events.push(e);
    }
    (repo, events)
}

fn ids(events: impl IntoIterator<Item = Event>) -> BTreeSet<CalId> {
    events.into_iter().map(|e| e.cal_id).collect()
}

proptest! {
    #[test]
    fn key_order_follows_time_within_a_century(a in CENTURY_START..CENTURY_END, b in CENTURY_START..CENTURY_END) {
        let (t1, t2) = (instant(a.min(b)), instant(a.max(b)));
        let k1 = StorageKey::new("qlv", t1).unwrap().to_path();
        let k2 = StorageKey::new("qlv", t2).unwrap().to_path();
        prop_assert!(k1 <= k2);
        if t1.timestamp() / 60 != t2.timestamp() / 60 {
            prop_assert!(k1 < k2);
        }
    }

    #[test]
    fn range_scan_matches_brute_force(
        saved in saved_strategy(),
        typ in 0usize..TYPES.len(),
        from in 0i64..6 * 60,
        span in 0i64..6 * 60,
    ) {
        let (repo, events) = seeded(&saved);
        let typ = TYPES[typ];
        let min = StorageKey::new(typ, base() + TimeDelta::minutes(from)).unwrap();
        let max = StorageKey::new(typ, base() + TimeDelta::minutes(from + span)).unwrap();

        let expected = ids(events.into_iter().filter(|e| {
            let Some(start) = e.start_time else { return false };
            let key = StorageKey::new(&e.event_type, start).unwrap();
            min <= key && key <= max
        }));
        let cursor = DateCursor::new(base() + TimeDelta::minutes(from), TimeDelta::minutes(span));
        let got = repo.load_events(cursor, &[typ]).expect("load");
        prop_assert_eq!(ids(got.clone()), expected);

        let starts: Vec<_> = got.iter().filter_map(|e| e.start_time).collect();
        prop_assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn negative_span_loads_the_same_window(
        saved in saved_strategy(),
        at in 0i64..6 * 60,
        span in 0i64..6 * 60,
    ) {
        let (repo, _) = seeded(&saved);
        let t = base() + TimeDelta::minutes(at);
        let h = TimeDelta::minutes(span);

        let back = repo.load_events(DateCursor::new(t, -h), &TYPES).expect("back");
        let fwd = repo.load_events(DateCursor::new(t - h, h), &TYPES).expect("fwd");
        prop_assert!(back.same_members(&fwd));
        prop_assert_eq!(back.len(), fwd.len());
    }
}
