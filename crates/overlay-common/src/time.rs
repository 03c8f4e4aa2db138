//! Snapshot time selection for time-enabled map services.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A service-declared time extent: the instants it can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeExtent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Publication step between consecutive instants.
    pub step: Duration,
}

impl TimeExtent {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Self {
        Self { start, end, step }
    }

    /// The most recent instant that is reliably populated upstream.
    ///
    /// Services routinely advertise an end instant whose data has not
    /// landed yet, so the chosen snapshot is one step back from the end.
    pub fn latest_populated(&self) -> DateTime<Utc> {
        self.end - self.step
    }
}

/// The single instant chosen for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTime {
    pub instant: DateTime<Utc>,
    /// True when no service metadata was available and the instant was
    /// synthesized from the wall clock.
    pub synthetic: bool,
}

impl SnapshotTime {
    /// Derive from a declared time extent: `end - step`.
    pub fn from_extent(extent: &TimeExtent) -> Self {
        Self {
            instant: extent.latest_populated(),
            synthetic: false,
        }
    }

    /// Synthesize from the wall clock, truncated down to the most recent
    /// cadence boundary (e.g. the last 3-hour mark for a 3-hourly grid).
    /// Total: never fails regardless of input.
    pub fn synthetic(now: DateTime<Utc>, cadence_hours: u32) -> Self {
        let cadence_secs = i64::from(cadence_hours.max(1)) * 3600;
        let secs = now.timestamp();
        let truncated = secs - secs.rem_euclid(cadence_secs);
        let instant = Utc
            .timestamp_opt(truncated, 0)
            .single()
            .unwrap_or(now);
        Self {
            instant,
            synthetic: true,
        }
    }

    /// Epoch milliseconds, the encoding ArcGIS-style services expect.
    pub fn epoch_millis(&self) -> i64 {
        self.instant.timestamp_millis()
    }

    /// ISO-8601 with Z suffix, the encoding WMS services expect.
    pub fn iso8601(&self) -> String {
        self.instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Human-readable form for artifact titles.
    pub fn display(&self) -> String {
        self.instant.format("%Y-%m-%d %H:%M UTC").to_string()
    }
}
