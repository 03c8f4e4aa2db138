//! Metadata document parsing for the three service families.
//!
//! ArcGIS-style services answer `?f=json` with a JSON service info
//! document; WMS services answer GetCapabilities with XML. Both are
//! adapted into the family-neutral [`ServiceDescriptor`].

use chrono::{DateTime, Duration, TimeZone, Utc};
use overlay_common::{OverlayError, OverlayResult, TimeExtent};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::endpoint::{EndpointCandidate, EndpointKind, LayerInfo, ServiceDescriptor};

/// Step assumed when a service advertises an extent without an interval.
const DEFAULT_STEP: i64 = 3600;

/// Parse the metadata body for a candidate into a descriptor.
pub fn parse_descriptor(
    candidate: &EndpointCandidate,
    body: &str,
) -> OverlayResult<ServiceDescriptor> {
    match candidate.kind {
        EndpointKind::GridService | EndpointKind::ImageService => {
            parse_arcgis(candidate, body)
        }
        EndpointKind::LegacyMapService => parse_wms_capabilities(candidate, body),
    }
}

// === ArcGIS-style JSON ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArcGisServiceInfo {
    /// MapServer uses `mapName`, ImageServer uses `name`.
    map_name: Option<String>,
    name: Option<String>,
    #[serde(default)]
    layers: Vec<ArcGisLayer>,
    time_info: Option<ArcGisTimeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArcGisLayer {
    id: i64,
    name: String,
    time_info: Option<ArcGisTimeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArcGisTimeInfo {
    /// `[startMillis, endMillis]`; entries may be null on broken services.
    #[serde(default)]
    time_extent: Vec<Option<i64>>,
    default_time_interval: Option<i64>,
    default_time_interval_units: Option<String>,
}

impl ArcGisTimeInfo {
    fn to_extent(&self) -> Option<TimeExtent> {
        let start_ms = *self.time_extent.first()?;
        let end_ms = *self.time_extent.get(1)?;
        let start = Utc.timestamp_millis_opt(start_ms?).single()?;
        let end = Utc.timestamp_millis_opt(end_ms?).single()?;
        let step = self
            .default_time_interval
            .map(|n| interval_duration(n, self.default_time_interval_units.as_deref()))
            .unwrap_or_else(|| Duration::seconds(DEFAULT_STEP));
        Some(TimeExtent::new(start, end, step))
    }
}

/// Convert an esri interval count plus units string into a duration.
fn interval_duration(count: i64, units: Option<&str>) -> Duration {
    match units {
        Some("esriTimeUnitsSeconds") => Duration::seconds(count),
        Some("esriTimeUnitsMinutes") => Duration::minutes(count),
        Some("esriTimeUnitsDays") => Duration::days(count),
        // Hours is the NDFD default and the safest guess for unknowns.
        _ => Duration::hours(count),
    }
}

fn parse_arcgis(
    candidate: &EndpointCandidate,
    body: &str,
) -> OverlayResult<ServiceDescriptor> {
    let info: ArcGisServiceInfo =
        serde_json::from_str(body).map_err(|e| OverlayError::MetadataMalformed {
            endpoint: candidate.name.clone(),
            message: e.to_string(),
        })?;

    let display_name = info
        .map_name
        .or(info.name)
        .unwrap_or_else(|| candidate.name.clone());

    let layers = info
        .layers
        .iter()
        .map(|l| LayerInfo {
            id: l.id.to_string(),
            name: l.name.clone(),
            time_extent: l.time_info.as_ref().and_then(|t| t.to_extent()),
        })
        .collect();

    Ok(ServiceDescriptor {
        display_name,
        layers,
        time_extent: info.time_info.as_ref().and_then(|t| t.to_extent()),
    })
}

// === WMS GetCapabilities XML ===

/// Parse a WMS capabilities document into a descriptor.
///
/// Extracts the service title, layer names, and each layer's time
/// dimension. Both WMS 1.3.0 `<Dimension name="time">` and the 1.1.1
/// `<Extent name="time">` spellings are accepted.
fn parse_wms_capabilities(
    candidate: &EndpointCandidate,
    xml: &str,
) -> OverlayResult<ServiceDescriptor> {
    // Text nodes are routed to whichever slot the enclosing element
    // selected; avoids nested event reads against the same buffer.
    #[derive(PartialEq)]
    enum Capture {
        Nothing,
        ServiceTitle,
        LayerName,
        TimeDimension,
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut display_name = candidate.name.clone();
    let mut layers: Vec<LayerInfo> = Vec::new();

    let mut in_service = false;
    let mut layer_depth = 0u32;
    let mut capture = Capture::Nothing;
    let mut current_name: Option<String> = None;
    let mut dimension_content = String::new();
    let mut current_extent: Option<TimeExtent> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"Service" => in_service = true,
                b"Layer" => {
                    layer_depth += 1;
                    current_name = None;
                    current_extent = None;
                }
                b"Title" if in_service => capture = Capture::ServiceTitle,
                b"Name" if layer_depth > 0 => capture = Capture::LayerName,
                b"Dimension" | b"Extent" if layer_depth > 0 => {
                    if has_time_name_attr(&e) {
                        capture = Capture::TimeDimension;
                        dimension_content.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Ok(text) = t.unescape() {
                    match capture {
                        Capture::ServiceTitle => display_name = text.into_owned(),
                        Capture::LayerName => current_name = Some(text.into_owned()),
                        Capture::TimeDimension => dimension_content.push_str(&text),
                        Capture::Nothing => {}
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"Dimension" | b"Extent" if capture == Capture::TimeDimension => {
                    capture = Capture::Nothing;
                    current_extent = parse_time_dimension(&dimension_content);
                }
                b"Service" => {
                    in_service = false;
                    capture = Capture::Nothing;
                }
                b"Layer" => {
                    layer_depth = layer_depth.saturating_sub(1);
                    if let Some(name) = current_name.take() {
                        layers.push(LayerInfo {
                            id: name.clone(),
                            name,
                            time_extent: current_extent.take(),
                        });
                    }
                }
                _ => capture = Capture::Nothing,
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(OverlayError::MetadataMalformed {
                    endpoint: candidate.name.clone(),
                    message: format!(
                        "XML error at position {}: {:?}",
                        reader.buffer_position(),
                        e
                    ),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    if layers.is_empty() {
        return Err(OverlayError::MetadataMalformed {
            endpoint: candidate.name.clone(),
            message: "capabilities document advertises no layers".to_string(),
        });
    }

    Ok(ServiceDescriptor {
        display_name,
        layers,
        // WMS advertises time per layer, not globally.
        time_extent: None,
    })
}

fn has_time_name_attr(e: &quick_xml::events::BytesStart<'_>) -> bool {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"name" {
            return attr.value.eq_ignore_ascii_case(b"time");
        }
    }
    false
}

/// Parse a WMS time dimension value into an extent.
///
/// Accepts the interval form `start/end/period` and the enumerated form
/// `t1,t2,...,tn` (step derived from the trailing pair).
fn parse_time_dimension(content: &str) -> Option<TimeExtent> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }

    if content.contains('/') {
        let parts: Vec<&str> = content.split('/').collect();
        if parts.len() < 2 {
            return None;
        }
        let start = parse_instant(parts[0])?;
        let end = parse_instant(parts[1])?;
        let step = parts
            .get(2)
            .and_then(|p| parse_iso8601_period(p))
            .unwrap_or_else(|| Duration::seconds(DEFAULT_STEP));
        return Some(TimeExtent::new(start, end, step));
    }

    let instants: Vec<DateTime<Utc>> = content
        .split(',')
        .filter_map(|s| parse_instant(s.trim()))
        .collect();
    match instants.as_slice() {
        [] => None,
        [only] => Some(TimeExtent::new(
            *only,
            *only,
            Duration::seconds(DEFAULT_STEP),
        )),
        [.., prev, last] => {
            let step = (*last - *prev).abs();
            let (start, end) = if instants.first()? <= last {
                (*instants.first()?, *last)
            } else {
                // Some services enumerate newest-first.
                (*last, *instants.first()?)
            };
            Some(TimeExtent::new(start, end, step))
        }
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse the ISO-8601 period subset services actually emit:
/// `P<n>D`, `PT<n>H`, `PT<n>M`, `PT<n>S` and combinations.
fn parse_iso8601_period(s: &str) -> Option<Duration> {
    let s = s.trim();
    let rest = s.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut total = Duration::zero();
    let mut num = String::new();
    for c in date_part.chars() {
        if c.is_ascii_digit() {
            num.push(c);
        } else {
            let n: i64 = num.parse().ok()?;
            num.clear();
            match c {
                'D' => total = total + Duration::days(n),
                'W' => total = total + Duration::weeks(n),
                // Months and years do not occur in weather dimensions.
                _ => return None,
            }
        }
    }
    for c in time_part.chars() {
        if c.is_ascii_digit() {
            num.push(c);
        } else {
            let n: i64 = num.parse().ok()?;
            num.clear();
            match c {
                'H' => total = total + Duration::hours(n),
                'M' => total = total + Duration::minutes(n),
                'S' => total = total + Duration::seconds(n),
                _ => return None,
            }
        }
    }

    if total > Duration::zero() {
        Some(total)
    } else {
        None
    }
}
