//! Generator configuration.
//!
//! Everything the pipeline needs is an explicit immutable value handed
//! to the orchestrator: the ordered endpoint candidates, the ordered
//! parameter sets, the fixed bbox, output dimensions, and where the
//! overlay will be hosted. A YAML file can override any field; the
//! built-in default mirrors the NDFD CONUS temperature deployment.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use map_services::{
    params, ClientConfig, EndpointCandidate, EndpointKind, ParameterSet,
};
use overlay_common::BoundingBox;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Candidate services in priority order.
    pub endpoints: Vec<EndpointCandidate>,
    /// Request parameter hypotheses in priority order; the last entry is
    /// the designated unverified fallback.
    pub parameter_sets: Vec<ParameterSet>,
    /// The fixed extent every published overlay declares.
    pub bbox: BoundingBox,
    pub width: u32,
    pub height: u32,
    /// Publication cadence of the grid, used for the synthetic snapshot
    /// time fallback.
    pub cadence_hours: u32,
    pub metadata_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub overlay_title: String,
    pub legend_url: Option<String>,
    /// Where the overlay document will be hosted; the pointer document
    /// redirects viewers here.
    pub published_url: String,
    pub refresh_interval_secs: u32,
    pub overlay_file: String,
    pub pointer_file: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            parameter_sets: params::default_parameter_sets(),
            bbox: BoundingBox::conus(),
            width: 1024,
            height: 768,
            cadence_hours: 3,
            metadata_timeout_secs: 15,
            probe_timeout_secs: 20,
            connect_timeout_secs: 10,
            overlay_title: "CONUS Temperature (NDFD)".to_string(),
            legend_url: Some(
                "https://digital.weather.gov/staticpages/legend/tempscale_conus.png"
                    .to_string(),
            ),
            published_url:
                "https://yourorg.github.io/weather-overlay/conus_temp_live.kml".to_string(),
            refresh_interval_secs: 1800,
            overlay_file: "conus_temp_live.kml".to_string(),
            pointer_file: "conus_temp_link.kml".to_string(),
        }
    }
}

/// The NDFD temperature services, newest API surface first, the legacy
/// WMS endpoint as the last resort.
fn default_endpoints() -> Vec<EndpointCandidate> {
    vec![
        EndpointCandidate {
            name: "ndfd-grid".to_string(),
            base_url:
                "https://mapservices.weather.noaa.gov/raster/rest/services/NDFD_temp/MapServer"
                    .to_string(),
            kind: EndpointKind::GridService,
        },
        EndpointCandidate {
            name: "ndfd-image".to_string(),
            base_url:
                "https://idpgis.ncep.noaa.gov/arcgis/rest/services/NWS_Forecasts_Guidance_Warnings/ndfd_temp/ImageServer"
                    .to_string(),
            kind: EndpointKind::ImageService,
        },
        EndpointCandidate {
            name: "ndfd-wms".to_string(),
            base_url: "https://digital.weather.gov/ndfd/wms".to_string(),
            kind: EndpointKind::LegacyMapService,
        },
    ]
}

impl GeneratorConfig {
    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: GeneratorConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), endpoints = config.endpoints.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            metadata_timeout: Duration::from_secs(self.metadata_timeout_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
