//! Image validation probe outcome classification.
//!
//! A probe is a real GET of the candidate image URL, not an existence
//! check: several upstream services answer 200 with a JSON error body or
//! an embedded error image, so only a 2xx status paired with an image
//! content-type counts as acceptance.

/// Why a probe rejected a candidate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Status outside 200-299.
    HttpError(u16),
    /// 2xx but the content-type is not an image media type. Carries the
    /// content-type for operator diagnostics.
    NonImageContent(String),
    /// Request exceeded its timeout or the connection failed.
    Timeout,
}

/// The result of probing one candidate image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub reason: Option<RejectReason>,
}

impl ValidationOutcome {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }
}

/// Classify a completed HTTP exchange.
pub fn classify(status: u16, content_type: Option<&str>) -> ValidationOutcome {
    if !(200..300).contains(&status) {
        return ValidationOutcome::rejected(RejectReason::HttpError(status));
    }

    match content_type {
        Some(ct) if is_image_media_type(ct) => ValidationOutcome::accepted(),
        Some(ct) => {
            ValidationOutcome::rejected(RejectReason::NonImageContent(ct.to_string()))
        }
        None => ValidationOutcome::rejected(RejectReason::NonImageContent(
            "<missing content-type>".to_string(),
        )),
    }
}

fn is_image_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .map_or(false, |essence| {
            essence.to_ascii_lowercase().starts_with("image/")
        })
}
