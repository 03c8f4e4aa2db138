//! Endpoint resolution: first candidate with well-formed metadata wins.

use overlay_common::{OverlayError, OverlayResult};
use tracing::{info, warn};

use crate::client::MapServiceClient;
use crate::endpoint::{EndpointCandidate, ServiceDescriptor};

/// Walk the candidate list in priority order and return the first one
/// whose metadata query succeeds, together with its parsed descriptor.
///
/// First success short-circuits; later candidates are never queried.
/// Per-candidate failures are logged and skipped. Exhausting the list is
/// the fatal `NoWorkingEndpoint`.
pub async fn resolve<'a>(
    client: &dyn MapServiceClient,
    candidates: &'a [EndpointCandidate],
) -> OverlayResult<(&'a EndpointCandidate, ServiceDescriptor)> {
    for candidate in candidates {
        match client.fetch_metadata(candidate).await {
            Ok(descriptor) => {
                info!(
                    endpoint = %candidate.name,
                    service = %descriptor.display_name,
                    layers = descriptor.layers.len(),
                    has_time_extent = descriptor.time_extent.is_some(),
                    "Resolved working endpoint"
                );
                return Ok((candidate, descriptor));
            }
            Err(e) => {
                warn!(endpoint = %candidate.name, error = %e, "Candidate failed, trying next");
            }
        }
    }

    Err(OverlayError::NoWorkingEndpoint {
        attempted: candidates.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::endpoint::EndpointKind;
    use crate::probe::ValidationOutcome;

    /// Scripted client: candidates listed in `working` succeed, every
    /// query is recorded.
    struct ScriptedClient {
        working: Vec<String>,
        queried: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(working: &[&str]) -> Self {
            Self {
                working: working.iter().map(|s| s.to_string()).collect(),
                queried: Mutex::new(Vec::new()),
            }
        }

        fn queried(&self) -> Vec<String> {
            self.queried.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MapServiceClient for ScriptedClient {
        async fn fetch_metadata(
            &self,
            candidate: &EndpointCandidate,
        ) -> OverlayResult<ServiceDescriptor> {
            self.queried.lock().unwrap().push(candidate.name.clone());
            if self.working.contains(&candidate.name) {
                Ok(ServiceDescriptor {
                    display_name: candidate.name.clone(),
                    layers: Vec::new(),
                    time_extent: None,
                })
            } else {
                Err(OverlayError::EndpointUnreachable {
                    endpoint: candidate.name.clone(),
                    reason: "scripted failure".to_string(),
                })
            }
        }

        async fn probe_image(&self, _url: &str) -> ValidationOutcome {
            ValidationOutcome::accepted()
        }
    }

    fn candidates(names: &[&str]) -> Vec<EndpointCandidate> {
        names
            .iter()
            .map(|n| EndpointCandidate {
                name: n.to_string(),
                base_url: format!("https://example.com/{n}"),
                kind: EndpointKind::GridService,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let client = ScriptedClient::new(&["b", "c"]);
        let list = candidates(&["a", "b", "c"]);

        let (winner, _) = resolve(&client, &list).await.unwrap();
        assert_eq!(winner.name, "b");
        // "c" must never be queried once "b" succeeds.
        assert_eq!(client.queried(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_first_candidate_wins_without_further_queries() {
        let client = ScriptedClient::new(&["a"]);
        let list = candidates(&["a", "b"]);

        let (winner, _) = resolve(&client, &list).await.unwrap();
        assert_eq!(winner.name, "a");
        assert_eq!(client.queried(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_exhaustion_is_no_working_endpoint() {
        let client = ScriptedClient::new(&[]);
        let list = candidates(&["a", "b"]);

        let err = resolve(&client, &list).await.unwrap_err();
        match err {
            OverlayError::NoWorkingEndpoint { attempted } => assert_eq!(attempted, 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_fatal());
    }
}
