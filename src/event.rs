//! Canonical event record and collection helpers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::types::CalId;

/// One scheduled occurrence: a match, a race or a tournament stage.
///
/// Every field is optional on decode so records written by older or newer
/// schema revisions still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    /// Identifier, unique per [`Event::event_type`]. Valid when `> 0`.
    pub cal_id: CalId,
    /// Start instant. `None` is the zero value and makes the event invalid.
    pub start_time: Option<DateTime<Utc>>,
    /// Length of the occurrence, stored as signed nanoseconds.
    #[serde(with = "duration_nanos")]
    pub duration: TimeDelta,
    /// When the source last changed this event.
    pub last_modified: Option<DateTime<Utc>>,
    /// Registry type id, also the top-level partition.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Tournament or race category.
    pub category: String,
    /// Stage inside the category.
    pub stage: String,
    /// Free-text body, e.g. the match list.
    pub content: String,
    /// Number of matches announced.
    pub match_count: u32,
    /// Source URLs; compared as a set.
    pub links: Vec<String>,
    /// Canceled events are kept, not removed.
    pub canceled: bool,
    /// Topical tags for posting; ignored by [`Event::equals`].
    pub tag_names: Vec<String>,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            cal_id: 0,
            start_time: None,
            duration: TimeDelta::zero(),
            last_modified: None,
            event_type: String::new(),
            category: String::new(),
            stage: String::new(),
            content: String::new(),
            match_count: 0,
            links: Vec::new(),
            canceled: false,
            tag_names: Vec::new(),
        }
    }
}

impl Event {
    /// True when the event has a start time and a positive id.
    pub fn is_valid(&self) -> bool {
        self.start_time.is_some() && self.cal_id > 0
    }

    /// Change-detection equality.
    ///
    /// Ignores `tag_names`, `last_modified` and `match_count`; `links` are
    /// compared regardless of order.
    pub fn equals(&self, other: &Event) -> bool {
        self.cal_id == other.cal_id
            && self.start_time == other.start_time
            && self.duration == other.duration
            && self.event_type == other.event_type
            && self.category == other.category
            && self.stage == other.stage
            && self.content == other.content
            && same_set(&self.links, &other.links)
            && self.canceled == other.canceled
    }

    /// `start_time + duration`, when the start is known.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
            .and_then(|start| start.checked_add_signed(self.duration))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = match self.start_time {
            Some(t) => t.format("%Y-%m-%d %H:%M UTC").to_string(),
            None => "-".to_string(),
        };
        let duration = format_duration(self.duration);
        if self.category.is_empty() || self.stage.is_empty() {
            write!(f, "<{start}//{duration}>")
        } else {
            write!(
                f,
                "<[{}:{}] @ {start}//{duration}>",
                self.category, self.stage
            )
        }
    }
}

fn same_set(a: &[String], b: &[String]) -> bool {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

fn format_duration(d: TimeDelta) -> String {
    let secs = d.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    format!("{sign}{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Ordered sequence of events with set-like membership helpers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Events(Vec<Event>);

impl Events {
    /// Empty collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `event`.
    pub fn push(&mut self, event: Event) {
        self.0.push(event);
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no events.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in stored order.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.0.iter()
    }

    /// Borrowed slice view.
    pub fn as_slice(&self) -> &[Event] {
        &self.0
    }

    /// Membership by [`Event::equals`].
    pub fn contains(&self, event: &Event) -> bool {
        self.0.iter().any(|e| e.equals(event))
    }

    /// True when both collections hold the same events, ignoring order.
    pub fn same_members(&self, other: &Events) -> bool {
        self.len() == other.len()
            && self.0.iter().all(|e| other.contains(e))
            && other.0.iter().all(|e| self.contains(e))
    }

    /// Sorts by start time, then type, then id.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.event_type.cmp(&b.event_type))
                .then_with(|| a.cal_id.cmp(&b.cal_id))
        });
    }

    /// Groups events sharing a start instant. Events without a start are dropped.
    pub fn group_by_start(&self) -> BTreeMap<DateTime<Utc>, Events> {
        let mut groups: BTreeMap<DateTime<Utc>, Events> = BTreeMap::new();
        for event in &self.0 {
            if let Some(start) = event.start_time {
                groups.entry(start).or_default().push(event.clone());
            }
        }
        groups
    }

    /// Consumes the collection.
    pub fn into_vec(self) -> Vec<Event> {
        self.0
    }
}

impl From<Vec<Event>> for Events {
    fn from(value: Vec<Event>) -> Self {
        Self(value)
    }
}

impl FromIterator<Event> for Events {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Event> for Events {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Events {
    type Item = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Events {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Spans beyond `i64` nanoseconds (about 292 years) fail to serialize.
mod duration_nanos {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer, ser::Error as _};

    pub fn serialize<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = value
            .num_nanoseconds()
            .ok_or_else(|| S::Error::custom("duration out of range"))?;
        serializer.serialize_i64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        Ok(TimeDelta::nanoseconds(i64::deserialize(deserializer)?))
    }
}
