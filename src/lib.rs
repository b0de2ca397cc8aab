//! Time-partitioned event storage for esports and cycling schedules.
//!
//! Events are stored in nested buckets keyed by
//! `{type}/{YY}/{MM}/{DD}/{hh}/{mm}/{cal_id}` so that a time window turns
//! into a bounded scan below the deepest bucket both window ends share.
//!
//! # Examples
//!
//! In-memory usage with [`repository::Repository`]:
//! ```
//! use calstore::{
//!     config::RepositoryConfig,
//!     cursor::DateCursor,
//!     event::Event,
//!     repository::Repository,
//! };
//! use chrono::{TimeDelta, TimeZone, Utc};
//!
//! let repo = Repository::in_memory(&RepositoryConfig::default());
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
//! repo.save_event(&Event {
//!     cal_id: 1,
//!     start_time: Some(start),
//!     duration: TimeDelta::hours(2),
//!     event_type: "qlv".to_string(),
//!     ..Event::default()
//! }).expect("save");
//!
//! let day = DateCursor::new(start - TimeDelta::hours(10), TimeDelta::days(1));
//! let events = repo.load_events(day, &["qlv"]).expect("load");
//! assert_eq!(events.len(), 1);
//! assert!(repo.load_event("qlv", start, 1).is_valid());
//! ```
//!
//! File-backed usage:
//! ```no_run
//! use calstore::{config::RepositoryConfig, repository::Repository};
//!
//! let cfg = RepositoryConfig::load("calstore.toml".as_ref()).expect("config");
//! let repo = Repository::open(&cfg);
//! # let _ = repo;
//! ```

/// Storage keys and the hierarchical bucket store.
pub mod core;
/// Repository configuration.
pub mod config;
/// Scan windows.
pub mod cursor;
/// Error types.
pub mod error;
/// Event record and collection.
pub mod event;
/// Backend traits and implementations.
pub mod persist;
/// Event-type registry.
pub mod registry;
/// Typed save/load facade.
pub mod repository;
/// Shared primitive types and constants.
pub mod types;
