//! Request parameter sets: ordered hypotheses for the image export call.
//!
//! Each set is one complete, self-consistent shape of export parameters.
//! Services in the wild disagree about projection, format tokens, layer
//! selector syntax and time encoding, and reject unfamiliar shapes
//! outright; the search walks a fixed priority list where later entries
//! are deliberately smaller, on the assumption that a service rejecting
//! one shape may accept a strictly more conservative one.

use overlay_common::{BoundingBox, OverlayError, OverlayResult, SnapshotTime};
use reqwest::Url;
use serde::Deserialize;

use crate::endpoint::{EndpointCandidate, EndpointKind, ServiceDescriptor};

/// Spatial reference for both the bbox and the output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialRef {
    Epsg4326,
    Epsg3857,
}

impl SpatialRef {
    pub fn wkid(&self) -> u32 {
        match self {
            SpatialRef::Epsg4326 => 4326,
            SpatialRef::Epsg3857 => 3857,
        }
    }

    pub fn wms_crs(&self) -> &'static str {
        match self {
            SpatialRef::Epsg4326 => "EPSG:4326",
            SpatialRef::Epsg3857 => "EPSG:3857",
        }
    }
}

/// Output raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Png,
    Png32,
    Jpg,
}

impl ImageFormat {
    /// Token used by ArcGIS-style `format=` parameters.
    pub fn arcgis_token(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Png32 => "png32",
            ImageFormat::Jpg => "jpg",
        }
    }

    /// Media type used by WMS `format=` parameters.
    pub fn wms_media_type(&self) -> &'static str {
        match self {
            ImageFormat::Png | ImageFormat::Png32 => "image/png",
            ImageFormat::Jpg => "image/jpeg",
        }
    }
}

/// Layer selector syntax hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSelector {
    /// ArcGIS `layers=show:<id>` syntax.
    ShowId,
    /// Bare layer name, the WMS syntax (and a shape some ArcGIS
    /// deployments tolerated).
    ByName,
}

/// How the time value is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeEncoding {
    #[default]
    EpochMillis,
    Iso8601,
}

/// One hypothesis of export request parameters, tried in list order.
#[derive(Debug, Clone, Deserialize)]
pub struct ParameterSet {
    /// Identifier used in logs and the run summary.
    pub name: String,
    pub spatial_ref: SpatialRef,
    pub format: ImageFormat,
    pub selector: LayerSelector,
    /// Whether the time parameter is attached at all.
    #[serde(default = "default_true")]
    pub include_time: bool,
    #[serde(default)]
    pub time_encoding: TimeEncoding,
    #[serde(default = "default_true")]
    pub transparent: bool,
}

fn default_true() -> bool {
    true
}

impl ParameterSet {
    /// Construct the full image request URL for this hypothesis against
    /// the resolved endpoint.
    pub fn image_url(
        &self,
        candidate: &EndpointCandidate,
        descriptor: &ServiceDescriptor,
        time: &SnapshotTime,
        bbox: &BoundingBox,
        size: (u32, u32),
    ) -> OverlayResult<String> {
        let mut params: Vec<(&str, String)> = Vec::new();

        match candidate.kind {
            EndpointKind::GridService | EndpointKind::ImageService => {
                params.push(("bbox", self.arcgis_bbox(bbox)));
                params.push(("bboxSR", self.spatial_ref.wkid().to_string()));
                params.push(("imageSR", self.spatial_ref.wkid().to_string()));
                params.push(("size", format!("{},{}", size.0, size.1)));
                params.push(("format", self.format.arcgis_token().to_string()));
                params.push(("transparent", self.transparent.to_string()));

                if candidate.kind == EndpointKind::GridService {
                    if let Some(layer) = descriptor.primary_layer() {
                        let selector = match self.selector {
                            LayerSelector::ShowId => format!("show:{}", layer.id),
                            LayerSelector::ByName => layer.name.clone(),
                        };
                        params.push(("layers", selector));
                    }
                }

                if self.include_time {
                    params.push(("time", self.encode_time(time)));
                }
                params.push(("f", "image".to_string()));
            }
            EndpointKind::LegacyMapService => {
                let layer = descriptor.primary_layer().ok_or_else(|| {
                    OverlayError::InvalidUrl(format!(
                        "endpoint '{}' advertises no layer to request",
                        candidate.name
                    ))
                })?;

                params.push(("service", "WMS".to_string()));
                params.push(("version", "1.3.0".to_string()));
                params.push(("request", "GetMap".to_string()));
                params.push(("layers", layer.name.clone()));
                params.push(("styles", String::new()));
                params.push(("crs", self.spatial_ref.wms_crs().to_string()));
                params.push(("bbox", self.wms_bbox(bbox)));
                params.push(("width", size.0.to_string()));
                params.push(("height", size.1.to_string()));
                params.push(("format", self.format.wms_media_type().to_string()));
                params.push(("transparent", self.transparent.to_string()));

                if self.include_time {
                    params.push(("time", self.encode_time(time)));
                }
            }
        }

        let url = Url::parse_with_params(&candidate.export_url(), params)
            .map_err(|e| OverlayError::InvalidUrl(e.to_string()))?;
        Ok(url.into())
    }

    /// ArcGIS bbox: always x,y axis order.
    fn arcgis_bbox(&self, bbox: &BoundingBox) -> String {
        match self.spatial_ref {
            SpatialRef::Epsg4326 => bbox.to_query_string(),
            SpatialRef::Epsg3857 => bbox.to_web_mercator_query_string(),
        }
    }

    /// WMS 1.3.0 bbox: EPSG:4326 mandates lat,lon axis order.
    fn wms_bbox(&self, bbox: &BoundingBox) -> String {
        match self.spatial_ref {
            SpatialRef::Epsg4326 => bbox.to_latlon_query_string(),
            SpatialRef::Epsg3857 => bbox.to_web_mercator_query_string(),
        }
    }

    fn encode_time(&self, time: &SnapshotTime) -> String {
        match self.time_encoding {
            TimeEncoding::EpochMillis => time.epoch_millis().to_string(),
            TimeEncoding::Iso8601 => time.iso8601(),
        }
    }
}

/// The built-in priority list, most specific first. The final entry is
/// the designated minimal fallback the search publishes unverified when
/// every probe is rejected.
pub fn default_parameter_sets() -> Vec<ParameterSet> {
    vec![
        ParameterSet {
            name: "mercator-png32".to_string(),
            spatial_ref: SpatialRef::Epsg3857,
            format: ImageFormat::Png32,
            selector: LayerSelector::ShowId,
            include_time: true,
            time_encoding: TimeEncoding::EpochMillis,
            transparent: true,
        },
        ParameterSet {
            name: "mercator-png-iso-time".to_string(),
            spatial_ref: SpatialRef::Epsg3857,
            format: ImageFormat::Png,
            selector: LayerSelector::ByName,
            include_time: true,
            time_encoding: TimeEncoding::Iso8601,
            transparent: true,
        },
        ParameterSet {
            name: "geographic-png".to_string(),
            spatial_ref: SpatialRef::Epsg4326,
            format: ImageFormat::Png,
            selector: LayerSelector::ShowId,
            include_time: true,
            time_encoding: TimeEncoding::EpochMillis,
            transparent: true,
        },
        ParameterSet {
            name: "geographic-png-no-time".to_string(),
            spatial_ref: SpatialRef::Epsg4326,
            format: ImageFormat::Png,
            selector: LayerSelector::ByName,
            include_time: false,
            time_encoding: TimeEncoding::Iso8601,
            transparent: true,
        },
        // Designated fallback: the smallest shape we know how to emit.
        ParameterSet {
            name: "minimal".to_string(),
            spatial_ref: SpatialRef::Epsg4326,
            format: ImageFormat::Png,
            selector: LayerSelector::ShowId,
            include_time: false,
            time_encoding: TimeEncoding::EpochMillis,
            transparent: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::endpoint::LayerInfo;

    fn snapshot() -> SnapshotTime {
        SnapshotTime {
            instant: Utc.with_ymd_and_hms(2026, 8, 27, 12, 0, 0).unwrap(),
            synthetic: false,
        }
    }

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor {
            display_name: "NDFD".to_string(),
            layers: vec![LayerInfo {
                id: "0".to_string(),
                name: "ndfd.conus.temp".to_string(),
                time_extent: None,
            }],
            time_extent: None,
        }
    }

    fn grid_candidate() -> EndpointCandidate {
        EndpointCandidate {
            name: "grid".to_string(),
            base_url: "https://example.com/MapServer".to_string(),
            kind: EndpointKind::GridService,
        }
    }

    fn wms_candidate() -> EndpointCandidate {
        EndpointCandidate {
            name: "wms".to_string(),
            base_url: "https://example.com/wms".to_string(),
            kind: EndpointKind::LegacyMapService,
        }
    }

    #[test]
    fn test_arcgis_export_url_shape() {
        let sets = default_parameter_sets();
        let url = sets[2]
            .image_url(
                &grid_candidate(),
                &descriptor(),
                &snapshot(),
                &BoundingBox::conus(),
                (1024, 768),
            )
            .unwrap();

        assert!(url.starts_with("https://example.com/MapServer/export?"));
        assert!(url.contains("bbox=-130,20,-60,55"));
        assert!(url.contains("bboxSR=4326"));
        assert!(url.contains("size=1024,768"));
        assert!(url.contains("layers=show:0"));
        assert!(url.contains("time=1787832000000"));
        assert!(url.contains("f=image"));
    }

    #[test]
    fn test_wms_getmap_url_shape() {
        let sets = default_parameter_sets();
        let url = sets[1]
            .image_url(
                &wms_candidate(),
                &descriptor(),
                &snapshot(),
                &BoundingBox::conus(),
                (1024, 768),
            )
            .unwrap();

        assert!(url.starts_with("https://example.com/wms?"));
        assert!(url.contains("service=WMS"));
        assert!(url.contains("request=GetMap"));
        assert!(url.contains("layers=ndfd.conus.temp"));
        assert!(url.contains("crs=EPSG:3857"));
        assert!(url.contains("format=image/png"));
        assert!(url.contains("time=2026-08-27T12:00:00Z"));
    }

    #[test]
    fn test_wms_4326_uses_latlon_axis_order() {
        let set = ParameterSet {
            name: "geo".to_string(),
            spatial_ref: SpatialRef::Epsg4326,
            format: ImageFormat::Png,
            selector: LayerSelector::ByName,
            include_time: false,
            time_encoding: TimeEncoding::Iso8601,
            transparent: true,
        };
        let url = set
            .image_url(
                &wms_candidate(),
                &descriptor(),
                &snapshot(),
                &BoundingBox::conus(),
                (512, 512),
            )
            .unwrap();
        assert!(url.contains("bbox=20,-130,55,-60"));
    }

    #[test]
    fn test_time_omitted_when_not_included() {
        let sets = default_parameter_sets();
        let fallback = sets.last().unwrap();
        let url = fallback
            .image_url(
                &grid_candidate(),
                &descriptor(),
                &snapshot(),
                &BoundingBox::conus(),
                (1024, 768),
            )
            .unwrap();
        assert!(!url.contains("time="));
        assert!(url.contains("transparent=false"));
    }

    #[test]
    fn test_image_service_has_no_layer_selector() {
        let candidate = EndpointCandidate {
            kind: EndpointKind::ImageService,
            ..grid_candidate()
        };
        let sets = default_parameter_sets();
        let url = sets[0]
            .image_url(
                &candidate,
                &descriptor(),
                &snapshot(),
                &BoundingBox::conus(),
                (1024, 768),
            )
            .unwrap();
        assert!(url.contains("/exportImage?"));
        assert!(!url.contains("layers="));
    }

    #[test]
    fn test_default_list_ends_with_minimal_fallback() {
        let sets = default_parameter_sets();
        let last = sets.last().unwrap();
        assert_eq!(last.name, "minimal");
        assert!(!last.include_time);
        assert!(!last.transparent);
    }
}
