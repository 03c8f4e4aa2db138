//! KML artifact assembly for the weather overlay pipeline.
//!
//! Produces two documents:
//! - the primary overlay: a GroundOverlay referencing the resolved image
//!   URL over a fixed geographic box, plus a screen-pinned legend
//! - the pointer: a NetworkLink that redirects a viewer to wherever the
//!   overlay is hosted, refreshing on an interval

pub mod document;
pub mod overlay;
pub mod pointer;

pub use document::{validate_kml, EmbedStrategy};
pub use overlay::{assemble, OverlayArtifact, OverlayOptions};
pub use pointer::{assemble_pointer, PointerArtifact};
