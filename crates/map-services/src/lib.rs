//! Remote map service discovery and image request search.
//!
//! Implements the resilient half of the overlay pipeline:
//! - endpoint resolution over a prioritized candidate list
//! - snapshot time selection from service time metadata
//! - ordered parameter-set search with a live validation probe

pub mod client;
pub mod endpoint;
pub mod metadata;
pub mod params;
pub mod probe;
pub mod resolver;
pub mod search;
pub mod time_resolver;

pub use client::{ClientConfig, HttpMapClient, MapServiceClient};
pub use endpoint::{EndpointCandidate, EndpointKind, LayerInfo, ServiceDescriptor};
pub use params::{ImageFormat, LayerSelector, ParameterSet, SpatialRef, TimeEncoding};
pub use probe::{RejectReason, ValidationOutcome};
pub use resolver::resolve;
pub use search::{search, ImageReference};
pub use time_resolver::resolve_time;
