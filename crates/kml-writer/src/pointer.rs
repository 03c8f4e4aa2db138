//! Pointer document assembly.
//!
//! The pointer is the document a viewer actually opens: a NetworkLink
//! aimed at the externally hosted overlay, refreshing on an interval.
//! It decouples where the viewer looks from where the data lives, so
//! re-publishing the overlay never requires touching viewers.

use overlay_common::{OverlayError, OverlayResult};
use tracing::debug;

use crate::document::{validate_kml, EmbedStrategy};

/// The generated pointer document.
#[derive(Debug, Clone)]
pub struct PointerArtifact {
    pub kml: String,
    /// Where the overlay is hosted.
    pub published_url: String,
    pub refresh_interval_secs: u32,
}

/// Assemble the pointer document for a published overlay location.
pub fn assemble_pointer(
    name: &str,
    published_url: &str,
    refresh_interval_secs: u32,
) -> OverlayResult<PointerArtifact> {
    let strategy = EmbedStrategy::preferred_for(published_url);
    let kml = render(name, published_url, refresh_interval_secs, strategy);

    if let Err(first_failure) = validate_kml(&kml) {
        let retry = strategy.alternate();
        debug!(error = %first_failure, retry_strategy = ?retry, "Pointer failed validation, retrying");
        let kml = render(name, published_url, refresh_interval_secs, retry);
        validate_kml(&kml).map_err(OverlayError::ArtifactMalformed)?;
        return Ok(PointerArtifact {
            kml,
            published_url: published_url.to_string(),
            refresh_interval_secs,
        });
    }

    Ok(PointerArtifact {
        kml,
        published_url: published_url.to_string(),
        refresh_interval_secs,
    })
}

fn render(name: &str, published_url: &str, refresh_secs: u32, strategy: EmbedStrategy) -> String {
    let name = quick_xml::escape::escape(name);
    let href = strategy.embed(published_url);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>{name}</name>
    <NetworkLink>
      <name>{name}</name>
      <Link>
        <href>{href}</href>
        <refreshMode>onInterval</refreshMode>
        <refreshInterval>{refresh_secs}</refreshInterval>
      </Link>
    </NetworkLink>
  </Document>
</kml>
"#
    )
}
