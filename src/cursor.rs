//! Scan windows expressed as a reference instant plus a signed span.

use chrono::{DateTime, TimeDelta, Utc};

/// `(t, d)` scan window. A negative `d` reaches back from `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCursor {
    /// Reference instant.
    pub t: DateTime<Utc>,
    /// Signed window length.
    pub d: TimeDelta,
}

impl DateCursor {
    /// Builds a cursor.
    pub fn new(t: DateTime<Utc>, d: TimeDelta) -> Self {
        Self { t, d }
    }

    /// Window ending at `t` and spanning `d` backwards.
    pub fn before(t: DateTime<Utc>, d: TimeDelta) -> Self {
        Self { t, d: -d.abs() }
    }

    /// Normalized inclusive bounds `(min, max)` with `min <= max`.
    ///
    /// `t + d` saturates at the representable extremes.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let other = self.t.checked_add_signed(self.d).unwrap_or(if self.d < TimeDelta::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
        if self.d < TimeDelta::zero() {
            (other, self.t)
        } else {
            (self.t, other)
        }
    }

    /// True when `instant` lies inside the inclusive window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let (min, max) = self.bounds();
        min <= instant && instant <= max
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn negative_duration_swaps_bounds() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let back = DateCursor::new(t, TimeDelta::hours(-24));
        let fwd = DateCursor::new(t - TimeDelta::hours(24), TimeDelta::hours(24));
        assert_eq!(back.bounds(), fwd.bounds());
        assert_eq!(DateCursor::before(t, TimeDelta::hours(24)).bounds(), fwd.bounds());
    }

    #[test]
    fn bounds_saturate_instead_of_overflowing() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let c = DateCursor::new(t, TimeDelta::MAX);
        assert_eq!(c.bounds(), (t, DateTime::<Utc>::MAX_UTC));
        assert!(c.contains(t));
    }
}
