//! Common types shared across the weather-overlay crates.

pub mod bbox;
pub mod error;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{OverlayError, OverlayResult};
pub use time::{SnapshotTime, TimeExtent};
