//! Primary overlay document assembly.

use chrono::{DateTime, Utc};
use overlay_common::{BoundingBox, OverlayError, OverlayResult};
use tracing::{debug, warn};

use crate::document::{validate_kml, EmbedStrategy};

/// Display options carried into the generated document.
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// Document title; the snapshot time is appended to it.
    pub title: String,
    /// Legend image pinned to the viewer's screen, when configured.
    pub legend_url: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// The generated primary document plus its declared metadata.
#[derive(Debug, Clone)]
pub struct OverlayArtifact {
    pub kml: String,
    pub bbox: BoundingBox,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    /// Carried through from the image reference: false means the probe
    /// never confirmed the embedded URL.
    pub verified: bool,
    /// Which embedding the image URL ended up with.
    pub strategy: EmbedStrategy,
}

/// Assemble the overlay document for a resolved image reference.
///
/// The image URL is embedded under the strategy preferred for its
/// content, the document is re-parsed for well-formedness, and a failed
/// validation is retried once under the alternate strategy before the
/// fatal `ArtifactMalformed` is surfaced.
pub fn assemble(
    image_url: &str,
    snapshot_display: &str,
    verified: bool,
    bbox: &BoundingBox,
    options: &OverlayOptions,
) -> OverlayResult<OverlayArtifact> {
    let strategy = EmbedStrategy::preferred_for(image_url);

    match render_and_validate(image_url, snapshot_display, verified, bbox, options, strategy) {
        Ok(artifact) => Ok(artifact),
        Err(first_failure) => {
            let retry = strategy.alternate();
            warn!(
                error = %first_failure,
                retry_strategy = ?retry,
                "Overlay document failed validation, retrying with alternate embedding"
            );
            render_and_validate(image_url, snapshot_display, verified, bbox, options, retry)
                .map_err(OverlayError::ArtifactMalformed)
        }
    }
}

fn render_and_validate(
    image_url: &str,
    snapshot_display: &str,
    verified: bool,
    bbox: &BoundingBox,
    options: &OverlayOptions,
    strategy: EmbedStrategy,
) -> Result<OverlayArtifact, String> {
    let kml = render(image_url, snapshot_display, verified, bbox, options, strategy);
    validate_kml(&kml)?;
    debug!(strategy = ?strategy, bytes = kml.len(), "Overlay document validated");

    Ok(OverlayArtifact {
        kml,
        bbox: *bbox,
        title: format!("{} {}", options.title, snapshot_display),
        generated_at: options.generated_at,
        verified,
        strategy,
    })
}

fn render(
    image_url: &str,
    snapshot_display: &str,
    verified: bool,
    bbox: &BoundingBox,
    options: &OverlayOptions,
    strategy: EmbedStrategy,
) -> String {
    let title = quick_xml::escape::escape(&options.title);
    let href = strategy.embed(image_url);
    let generated = options.generated_at.format("%Y-%m-%dT%H:%M:%SZ");
    let verification = if verified { "verified" } else { "unverified" };

    let legend = options
        .legend_url
        .as_deref()
        .map(|url| {
            let legend_href = EmbedStrategy::preferred_for(url).embed(url);
            format!(
                r#"    <ScreenOverlay>
      <name>Legend</name>
      <Icon>
        <href>{legend_href}</href>
      </Icon>
      <overlayXY x="0" y="0" xunits="fraction" yunits="fraction"/>
      <screenXY x="0.02" y="0.02" xunits="fraction" yunits="fraction"/>
      <size x="0" y="0" xunits="pixels" yunits="pixels"/>
    </ScreenOverlay>
"#
            )
        })
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>{title} {snapshot_display}</name>
    <description>Generated {generated} ({verification} image reference)</description>
    <GroundOverlay>
      <name>{title}</name>
      <Icon>
        <href>{href}</href>
      </Icon>
      <LatLonBox>
        <north>{north}</north>
        <south>{south}</south>
        <east>{east}</east>
        <west>{west}</west>
      </LatLonBox>
    </GroundOverlay>
{legend}  </Document>
</kml>
"#,
        north = bbox.north,
        south = bbox.south,
        east = bbox.east,
        west = bbox.west,
    )
}
