//! Ordered parameter-set search against the validation probe.

use overlay_common::{BoundingBox, OverlayError, OverlayResult, SnapshotTime};
use tracing::{info, warn};

use crate::client::MapServiceClient;
use crate::endpoint::{EndpointCandidate, ServiceDescriptor};
use crate::params::ParameterSet;

/// The finally-accepted image request URL for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub url: String,
    /// Snapshot instant encoded into the URL (when the winning set
    /// attaches one).
    pub time: SnapshotTime,
    /// False when the probe never confirmed this URL and the designated
    /// fallback was published anyway.
    pub verified: bool,
    /// Name of the parameter set that produced the URL.
    pub parameter_set: String,
}

/// Try each parameter set in priority order; the first one whose probe
/// accepts wins and short-circuits the rest.
///
/// If every set is rejected the run still produces a result: the final
/// (designated minimal) set's URL is returned unprobed with
/// `verified = false`. Probe failure is a diagnostic, not a correctness
/// guarantee; the published artifact is not blocked on iffy confirmation.
pub async fn search(
    client: &dyn MapServiceClient,
    candidate: &EndpointCandidate,
    descriptor: &ServiceDescriptor,
    time: &SnapshotTime,
    sets: &[ParameterSet],
    bbox: &BoundingBox,
    size: (u32, u32),
) -> OverlayResult<ImageReference> {
    if sets.is_empty() {
        return Err(OverlayError::InvalidUrl(
            "no parameter sets configured".to_string(),
        ));
    }

    for set in sets {
        let url = match set.image_url(candidate, descriptor, time, bbox, size) {
            Ok(url) => url,
            Err(e) => {
                warn!(set = %set.name, error = %e, "Could not build request URL, skipping set");
                continue;
            }
        };

        let outcome = client.probe_image(&url).await;
        if outcome.accepted {
            info!(set = %set.name, url = %url, "Parameter set accepted by probe");
            return Ok(ImageReference {
                url,
                time: *time,
                verified: true,
                parameter_set: set.name.clone(),
            });
        }

        warn!(
            set = %set.name,
            reason = ?outcome.reason,
            "Parameter set rejected, trying next"
        );
    }

    // All rejected: publish the designated minimal fallback unverified.
    let fallback = &sets[sets.len() - 1];
    let url = fallback.image_url(candidate, descriptor, time, bbox, size)?;
    warn!(
        set = %fallback.name,
        url = %url,
        "Every parameter set rejected; publishing fallback unverified"
    );

    Ok(ImageReference {
        url,
        time: *time,
        verified: false,
        parameter_set: fallback.name.clone(),
    })
}
