//! Error types for the overlay generation pipeline.

use thiserror::Error;

/// Result type alias using OverlayError.
pub type OverlayResult<T> = Result<T, OverlayError>;

/// Primary error type for overlay generation.
#[derive(Debug, Error)]
pub enum OverlayError {
    // === Endpoint resolution ===
    /// A single candidate failed its metadata probe. Recovered by moving
    /// to the next candidate; only surfaced in logs.
    #[error("Endpoint '{endpoint}' unreachable: {reason}")]
    EndpointUnreachable { endpoint: String, reason: String },

    /// A candidate responded but its metadata could not be parsed.
    /// Treated the same as unreachable by the resolver.
    #[error("Malformed metadata from '{endpoint}': {message}")]
    MetadataMalformed { endpoint: String, message: String },

    /// Every configured candidate was exhausted. Fatal.
    #[error("No working endpoint among {attempted} candidates")]
    NoWorkingEndpoint { attempted: usize },

    // === Request construction ===
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    // === Artifact assembly ===
    /// The generated document failed well-formedness validation even
    /// after retrying with the alternate embedding strategy. Fatal.
    #[error("Overlay document malformed: {0}")]
    ArtifactMalformed(String),

    // === Infrastructure ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OverlayError {
    /// Whether this error must abort the run. Non-fatal conditions are
    /// absorbed by fallbacks before they ever reach the orchestrator.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OverlayError::NoWorkingEndpoint { .. }
                | OverlayError::ArtifactMalformed(_)
                | OverlayError::Io(_)
        )
    }
}
