//! Endpoint candidates and the descriptors their metadata parses into.

use overlay_common::TimeExtent;
use serde::Deserialize;

/// Protocol family of a candidate service.
///
/// The three families answer metadata queries differently and take
/// different export parameter grammars; the resolver probes them with
/// family-specific logic but awards first success uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// ArcGIS MapServer-style: `?f=json` metadata, `/export` images.
    GridService,
    /// ArcGIS ImageServer-style: `?f=json` metadata, `/exportImage` images.
    ImageService,
    /// OGC WMS: `GetCapabilities` XML metadata, `GetMap` images.
    LegacyMapService,
}

/// One statically configured service address, tried in priority order.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointCandidate {
    /// Short identifier used in logs and diagnostics.
    pub name: String,
    /// Service base address without query parameters.
    pub base_url: String,
    pub kind: EndpointKind,
}

impl EndpointCandidate {
    /// URL of the metadata document for this candidate's family.
    pub fn metadata_url(&self) -> String {
        match self.kind {
            EndpointKind::GridService | EndpointKind::ImageService => {
                format!("{}?f=json", self.base_url)
            }
            EndpointKind::LegacyMapService => format!(
                "{}?service=WMS&version=1.3.0&request=GetCapabilities",
                self.base_url
            ),
        }
    }

    /// Base URL of the image export operation.
    pub fn export_url(&self) -> String {
        match self.kind {
            EndpointKind::GridService => format!("{}/export", self.base_url),
            EndpointKind::ImageService => format!("{}/exportImage", self.base_url),
            // GetMap is a query on the same address.
            EndpointKind::LegacyMapService => self.base_url.clone(),
        }
    }
}

/// What a live service told us about itself. Lifetime: one pipeline run.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub display_name: String,
    /// Layers in the order the service advertises them.
    pub layers: Vec<LayerInfo>,
    /// Service-global time extent, when advertised.
    pub time_extent: Option<TimeExtent>,
}

impl ServiceDescriptor {
    /// The layer a parameter set should select by default: the first
    /// advertised layer, if any.
    pub fn primary_layer(&self) -> Option<&LayerInfo> {
        self.layers.first()
    }
}

/// A single advertised layer.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    /// Service-native identifier: a numeric id for ArcGIS-style services,
    /// the layer name for WMS.
    pub id: String,
    pub name: String,
    /// Per-layer time extent, consulted when the global one is absent.
    pub time_extent: Option<TimeExtent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(kind: EndpointKind) -> EndpointCandidate {
        EndpointCandidate {
            name: "test".to_string(),
            base_url: "https://example.com/svc".to_string(),
            kind,
        }
    }

    #[test]
    fn test_metadata_urls_per_family() {
        assert_eq!(
            candidate(EndpointKind::GridService).metadata_url(),
            "https://example.com/svc?f=json"
        );
        assert_eq!(
            candidate(EndpointKind::LegacyMapService).metadata_url(),
            "https://example.com/svc?service=WMS&version=1.3.0&request=GetCapabilities"
        );
    }

    #[test]
    fn test_export_urls_per_family() {
        assert_eq!(
            candidate(EndpointKind::GridService).export_url(),
            "https://example.com/svc/export"
        );
        assert_eq!(
            candidate(EndpointKind::ImageService).export_url(),
            "https://example.com/svc/exportImage"
        );
        assert_eq!(
            candidate(EndpointKind::LegacyMapService).export_url(),
            "https://example.com/svc"
        );
    }

    #[test]
    fn test_candidate_deserializes_from_config() {
        let yaml_equivalent = r#"{"name":"ndfd-wms","base_url":"https://digital.weather.gov/ndfd/wms","kind":"legacy_map_service"}"#;
        let c: EndpointCandidate = serde_json::from_str(yaml_equivalent).unwrap();
        assert_eq!(c.kind, EndpointKind::LegacyMapService);
    }
}
