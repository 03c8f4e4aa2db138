//! HTTP client layer for metadata queries and validation probes.
//!
//! The [`MapServiceClient`] trait is the seam between the pipeline logic
//! and the network; resolver and search tests drive it with scripted
//! fakes while production wires in the reqwest-backed [`HttpMapClient`].

use std::time::Duration;

use async_trait::async_trait;
use overlay_common::{OverlayError, OverlayResult};
use reqwest::{header, Client};
use tracing::{debug, warn};

use crate::endpoint::{EndpointCandidate, ServiceDescriptor};
use crate::metadata;
use crate::probe::{classify, RejectReason, ValidationOutcome};

/// How many leading body bytes of a non-image response are logged.
const ERROR_BODY_PREVIEW: usize = 256;

/// Timeouts for the two kinds of remote calls.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub metadata_timeout: Duration,
    pub probe_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            metadata_timeout: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Network operations the pipeline performs against remote services.
#[async_trait]
pub trait MapServiceClient: Send + Sync {
    /// Fetch and parse a candidate's metadata document.
    async fn fetch_metadata(
        &self,
        candidate: &EndpointCandidate,
    ) -> OverlayResult<ServiceDescriptor>;

    /// Retrieve a candidate image URL and classify the response.
    async fn probe_image(&self, url: &str) -> ValidationOutcome;
}

/// Production client backed by reqwest with bounded timeouts.
pub struct HttpMapClient {
    client: Client,
    config: ClientConfig,
}

impl HttpMapClient {
    pub fn new(config: ClientConfig) -> OverlayResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| OverlayError::EndpointUnreachable {
                endpoint: "<client>".to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl MapServiceClient for HttpMapClient {
    async fn fetch_metadata(
        &self,
        candidate: &EndpointCandidate,
    ) -> OverlayResult<ServiceDescriptor> {
        let url = candidate.metadata_url();
        debug!(endpoint = %candidate.name, url = %url, "Querying service metadata");

        let response = self
            .client
            .get(&url)
            .timeout(self.config.metadata_timeout)
            .send()
            .await
            .map_err(|e| OverlayError::EndpointUnreachable {
                endpoint: candidate.name.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OverlayError::EndpointUnreachable {
                endpoint: candidate.name.clone(),
                reason: format!("metadata query returned {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| OverlayError::EndpointUnreachable {
                endpoint: candidate.name.clone(),
                reason: format!("failed to read metadata body: {e}"),
            })?;

        metadata::parse_descriptor(candidate, &body)
    }

    async fn probe_image(&self, url: &str) -> ValidationOutcome {
        debug!(url = %url, "Probing candidate image URL");

        let response = match self
            .client
            .get(url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!(url = %url, error = %e, "Probe request failed");
                return ValidationOutcome::rejected(RejectReason::Timeout);
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let outcome = classify(status, content_type.as_deref());

        // A 2xx non-image body is usually a textual error payload; surface
        // its head for the operator. Diagnostics only, never retried here.
        if let Some(RejectReason::NonImageContent(_)) = outcome.reason {
            if let Ok(body) = response.text().await {
                let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
                warn!(url = %url, body = %preview, "Service returned non-image payload");
            }
        }

        outcome
    }
}
