//! Snapshot time selection from a resolved service descriptor.

use chrono::{DateTime, Utc};
use overlay_common::SnapshotTime;
use tracing::{debug, info};

use crate::endpoint::ServiceDescriptor;

/// Choose the single snapshot instant for this run.
///
/// Policy, in order:
/// 1. the service-global time extent, taking one step back from its end
///    (the nominal newest instant is frequently not yet populated),
/// 2. the first layer that advertises its own extent, same rule,
/// 3. the wall clock truncated to the publication cadence boundary.
///
/// Total function: missing time metadata degrades to the synthetic
/// fallback, which is a correct (if imprecise) result, not an error.
pub fn resolve_time(
    descriptor: &ServiceDescriptor,
    cadence_hours: u32,
    now: DateTime<Utc>,
) -> SnapshotTime {
    if let Some(extent) = &descriptor.time_extent {
        let snapshot = SnapshotTime::from_extent(extent);
        info!(snapshot = %snapshot.iso8601(), source = "service", "Resolved snapshot time");
        return snapshot;
    }

    for layer in &descriptor.layers {
        if let Some(extent) = &layer.time_extent {
            let snapshot = SnapshotTime::from_extent(extent);
            info!(
                snapshot = %snapshot.iso8601(),
                source = "layer",
                layer = %layer.name,
                "Resolved snapshot time"
            );
            return snapshot;
        }
    }

    let snapshot = SnapshotTime::synthetic(now, cadence_hours);
    debug!(
        snapshot = %snapshot.iso8601(),
        cadence_hours,
        "No time metadata advertised, synthesized snapshot time"
    );
    snapshot
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use overlay_common::TimeExtent;

    use super::*;
    use crate::endpoint::LayerInfo;

    fn descriptor(
        global: Option<TimeExtent>,
        layer_extents: Vec<Option<TimeExtent>>,
    ) -> ServiceDescriptor {
        ServiceDescriptor {
            display_name: "test".to_string(),
            layers: layer_extents
                .into_iter()
                .enumerate()
                .map(|(i, time_extent)| LayerInfo {
                    id: i.to_string(),
                    name: format!("layer-{i}"),
                    time_extent,
                })
                .collect(),
            time_extent: global,
        }
    }

    fn ms_extent(start: i64, end: i64, step_ms: i64) -> TimeExtent {
        TimeExtent::new(
            Utc.timestamp_millis_opt(start).unwrap(),
            Utc.timestamp_millis_opt(end).unwrap(),
            Duration::milliseconds(step_ms),
        )
    }

    #[test]
    fn test_global_extent_end_minus_step() {
        let desc = descriptor(Some(ms_extent(0, 1000, 500)), vec![]);
        let snap = resolve_time(&desc, 3, Utc::now());
        assert_eq!(snap.instant.timestamp_millis(), 500);
        assert!(!snap.synthetic);
    }

    #[test]
    fn test_first_layer_extent_when_global_absent() {
        let desc = descriptor(
            None,
            vec![None, Some(ms_extent(0, 7200_000, 3600_000)), Some(ms_extent(0, 1, 1))],
        );
        let snap = resolve_time(&desc, 3, Utc::now());
        // Second layer is the first one exposing an extent.
        assert_eq!(snap.instant.timestamp_millis(), 3600_000);
    }

    #[test]
    fn test_synthetic_fallback_never_fails() {
        let now = Utc.with_ymd_and_hms(2026, 8, 27, 16, 20, 0).unwrap();
        let desc = descriptor(None, vec![None, None]);
        let snap = resolve_time(&desc, 3, now);
        assert!(snap.synthetic);
        assert_eq!(
            snap.instant,
            Utc.with_ymd_and_hms(2026, 8, 27, 15, 0, 0).unwrap()
        );
    }
}
