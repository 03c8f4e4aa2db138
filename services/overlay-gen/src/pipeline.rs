//! Pipeline orchestration: resolve, time, search, assemble, write.
//!
//! Strictly sequential; each stage completes (network calls included)
//! before the next begins, and nothing is cached across runs. Fatal
//! errors carry the failing stage in their context.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use kml_writer::{assemble, assemble_pointer, OverlayOptions};
use map_services::{resolve, resolve_time, search, MapServiceClient};
use overlay_common::SnapshotTime;
use tracing::info;

use crate::config::GeneratorConfig;

/// Pipeline stages, named in diagnostics for fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EndpointResolution,
    TimeResolution,
    ParameterSearch,
    ArtifactAssembly,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::EndpointResolution => "endpoint resolution",
            Stage::TimeResolution => "time resolution",
            Stage::ParameterSearch => "parameter search",
            Stage::ArtifactAssembly => "artifact assembly",
            Stage::Output => "output",
        };
        f.write_str(name)
    }
}

/// What one run accomplished.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub endpoint: String,
    pub parameter_set: String,
    pub snapshot_time: SnapshotTime,
    pub verified: bool,
    pub image_url: String,
    pub overlay_path: Option<PathBuf>,
    pub pointer_path: Option<PathBuf>,
}

/// Execute one full pipeline run.
///
/// With `dry_run` the artifacts are assembled and validated but not
/// written. `now` is injected so runs are deterministic under test.
pub async fn run(
    config: &GeneratorConfig,
    client: &dyn MapServiceClient,
    output_dir: &Path,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<RunSummary> {
    // 1. Find a live endpoint.
    let (candidate, descriptor) = resolve(client, &config.endpoints)
        .await
        .with_context(|| format!("pipeline failed at stage: {}", Stage::EndpointResolution))?;

    // 2. Pick the snapshot instant. Total; never fails.
    let snapshot = resolve_time(&descriptor, config.cadence_hours, now);

    // 3. Find a parameter set the service accepts.
    let image = search(
        client,
        candidate,
        &descriptor,
        &snapshot,
        &config.parameter_sets,
        &config.bbox,
        config.size(),
    )
    .await
    .with_context(|| format!("pipeline failed at stage: {}", Stage::ParameterSearch))?;

    // 4. Assemble both documents.
    let options = OverlayOptions {
        title: config.overlay_title.clone(),
        legend_url: config.legend_url.clone(),
        generated_at: now,
    };
    let overlay = assemble(
        &image.url,
        &snapshot.display(),
        image.verified,
        &config.bbox,
        &options,
    )
    .with_context(|| format!("pipeline failed at stage: {}", Stage::ArtifactAssembly))?;

    let pointer = assemble_pointer(
        &config.overlay_title,
        &config.published_url,
        config.refresh_interval_secs,
    )
    .with_context(|| format!("pipeline failed at stage: {}", Stage::ArtifactAssembly))?;

    // 5. Persist.
    let (overlay_path, pointer_path) = if dry_run {
        info!("Dry run: skipping file output");
        (None, None)
    } else {
        let overlay_path = output_dir.join(&config.overlay_file);
        let pointer_path = output_dir.join(&config.pointer_file);
        tokio::fs::write(&overlay_path, overlay.kml.as_bytes())
            .await
            .with_context(|| format!("pipeline failed at stage: {}", Stage::Output))?;
        tokio::fs::write(&pointer_path, pointer.kml.as_bytes())
            .await
            .with_context(|| format!("pipeline failed at stage: {}", Stage::Output))?;
        (Some(overlay_path), Some(pointer_path))
    };

    let summary = RunSummary {
        endpoint: candidate.name.clone(),
        parameter_set: image.parameter_set.clone(),
        snapshot_time: snapshot,
        verified: image.verified,
        image_url: image.url,
        overlay_path,
        pointer_path,
    };

    info!(
        endpoint = %summary.endpoint,
        parameter_set = %summary.parameter_set,
        snapshot = %summary.snapshot_time.iso8601(),
        verified = summary.verified,
        "Run complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;
    use map_services::{
        EndpointCandidate, LayerInfo, RejectReason, ServiceDescriptor, ValidationOutcome,
    };
    use overlay_common::{OverlayError, OverlayResult, TimeExtent};

    use super::*;

    /// End-to-end fake: endpoint "a" is down, "b" serves a 0..1000 ms
    /// extent with a 500 ms step; the probe rejects the first parameter
    /// set and accepts everything after it.
    struct FakeServices {
        reject_first_n_probes: usize,
        probes: std::sync::Mutex<usize>,
    }

    #[async_trait]
    impl MapServiceClient for FakeServices {
        async fn fetch_metadata(
            &self,
            candidate: &EndpointCandidate,
        ) -> OverlayResult<ServiceDescriptor> {
            if candidate.name == "a" {
                return Err(OverlayError::EndpointUnreachable {
                    endpoint: "a".to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            Ok(ServiceDescriptor {
                display_name: "fake".to_string(),
                layers: vec![LayerInfo {
                    id: "0".to_string(),
                    name: "temp".to_string(),
                    time_extent: None,
                }],
                time_extent: Some(TimeExtent::new(
                    Utc.timestamp_millis_opt(0).unwrap(),
                    Utc.timestamp_millis_opt(1000).unwrap(),
                    chrono::Duration::milliseconds(500),
                )),
            })
        }

        async fn probe_image(&self, _url: &str) -> ValidationOutcome {
            let mut probes = self.probes.lock().unwrap();
            *probes += 1;
            if *probes <= self.reject_first_n_probes {
                ValidationOutcome::rejected(RejectReason::HttpError(400))
            } else {
                ValidationOutcome::accepted()
            }
        }
    }

    fn test_config() -> GeneratorConfig {
        let mut config = GeneratorConfig::default();
        config.endpoints = vec![
            EndpointCandidate {
                name: "a".to_string(),
                base_url: "https://a.example.com/MapServer".to_string(),
                kind: map_services::EndpointKind::GridService,
            },
            EndpointCandidate {
                name: "b".to_string(),
                base_url: "https://b.example.com/MapServer".to_string(),
                kind: map_services::EndpointKind::GridService,
            },
        ];
        config
    }

    #[tokio::test]
    async fn test_full_run_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeServices {
            reject_first_n_probes: 1,
            probes: std::sync::Mutex::new(0),
        };

        let summary = run(&test_config(), &client, dir.path(), Utc::now(), false)
            .await
            .unwrap();

        // Fallback endpoint won; snapshot is end - step = 500 ms.
        assert_eq!(summary.endpoint, "b");
        assert_eq!(summary.snapshot_time.instant.timestamp_millis(), 500);
        // First set rejected, second accepted.
        assert_eq!(summary.parameter_set, "mercator-png-iso-time");
        assert!(summary.verified);

        let overlay = std::fs::read_to_string(summary.overlay_path.unwrap()).unwrap();
        assert!(overlay.contains("<GroundOverlay>"));
        assert!(overlay.contains("b.example.com"));

        let pointer = std::fs::read_to_string(summary.pointer_path.unwrap()).unwrap();
        assert!(pointer.contains("<NetworkLink>"));
        assert!(pointer.contains("onInterval"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeServices {
            reject_first_n_probes: 0,
            probes: std::sync::Mutex::new(0),
        };

        let summary = run(&test_config(), &client, dir.path(), Utc::now(), true)
            .await
            .unwrap();

        assert!(summary.overlay_path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_all_endpoints_down_names_the_stage() {
        let mut config = test_config();
        config.endpoints.truncate(1); // only the dead "a"
        let client = FakeServices {
            reject_first_n_probes: 0,
            probes: std::sync::Mutex::new(0),
        };

        let err = run(&config, &client, Path::new("/tmp"), Utc::now(), true)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("endpoint resolution"));
    }

    #[tokio::test]
    async fn test_all_probes_rejected_still_succeeds_unverified() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeServices {
            reject_first_n_probes: usize::MAX,
            probes: std::sync::Mutex::new(0),
        };

        let summary = run(&test_config(), &client, dir.path(), Utc::now(), false)
            .await
            .unwrap();

        assert!(!summary.verified);
        assert_eq!(summary.parameter_set, "minimal");
        let overlay = std::fs::read_to_string(summary.overlay_path.unwrap()).unwrap();
        assert!(overlay.contains("unverified image reference"));
    }
}
