// crates/infra-probe-gcp/src/verifier.rs
// ============================================================================
// Module: GCP Resource Verifier
// Description: Existence checks over the Cloud Storage and Pub/Sub REST APIs.
// Purpose: Confirm that applied resources materialized in the provider.
// Dependencies: infra-probe-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`GcpVerifier`] issues one authenticated `GET` per check:
//! `{storage}/storage/v1/b/{bucket}` for buckets and
//! `{pubsub}/v1/projects/{project}/topics/{topic}` for topics. A `200`
//! response means the resource exists and a `404` means it does not. `401` and
//! `403` are credential failures. Anything else is a backend error carrying the
//! API's error message when one is present.
//!
//! Endpoints are configurable so tests can point the verifier at a local
//! stand-in. Redirects are never followed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use infra_probe_core::ResourceId;
use infra_probe_core::ResourceKind;
use infra_probe_core::ResourceVerifier;
use infra_probe_core::VerifyError;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::token::TokenProvider;
use crate::token::TokenSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Production Cloud Storage JSON API endpoint.
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
/// Production Pub/Sub API endpoint.
pub const DEFAULT_PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";
/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest API error message kept in a [`VerifyError::Backend`].
const MAX_ERROR_MESSAGE: usize = 512;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Verifier endpoints, timeout, and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpSettings {
    /// Cloud Storage API base URL.
    pub storage_endpoint: String,
    /// Pub/Sub API base URL.
    pub pubsub_endpoint: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Access token source.
    pub token: TokenSource,
}

impl Default for GcpSettings {
    fn default() -> Self {
        Self {
            storage_endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            pubsub_endpoint: DEFAULT_PUBSUB_ENDPOINT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            token: TokenSource::default(),
        }
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// [`ResourceVerifier`] backed by the Google REST APIs.
pub struct GcpVerifier {
    /// Blocking HTTP client.
    client: Client,
    /// Parsed storage endpoint.
    storage: Url,
    /// Parsed Pub/Sub endpoint.
    pubsub: Url,
    /// Bearer token source.
    tokens: TokenProvider,
}

impl GcpVerifier {
    /// Builds a verifier from settings.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Backend`] when an endpoint is not an HTTP(S) URL
    /// or the HTTP client cannot be built.
    pub fn new(settings: GcpSettings) -> Result<Self, VerifyError> {
        let storage = parse_endpoint("storage", &settings.storage_endpoint)?;
        let pubsub = parse_endpoint("pubsub", &settings.pubsub_endpoint)?;
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("infra-probe/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .build()
            .map_err(|_| VerifyError::Backend("http client build failed".to_string()))?;
        Ok(Self {
            client,
            storage,
            pubsub,
            tokens: TokenProvider::new(settings.token),
        })
    }

    /// Returns the URL queried for `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Backend`] when the endpoint cannot carry a path.
    pub fn resource_url(&self, resource: &ResourceId) -> Result<Url, VerifyError> {
        match resource.kind {
            ResourceKind::StorageBucket => {
                with_segments(&self.storage, &["storage", "v1", "b", &resource.name])
            }
            ResourceKind::PubsubTopic => with_segments(
                &self.pubsub,
                &["v1", "projects", &resource.project, "topics", &resource.name],
            ),
        }
    }
}

impl ResourceVerifier for GcpVerifier {
    fn verify_exists(&self, resource: &ResourceId) -> Result<(), VerifyError> {
        let url = self.resource_url(resource)?;
        let token = self.tokens.token()?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|err| VerifyError::Backend(format!("{resource}: request failed: {err}")))?;
        let status = response.status();
        match status {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(VerifyError::NotFound(resource.clone())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let message = error_message(response.text().unwrap_or_default());
                Err(VerifyError::Credentials(format!("{resource}: {status}: {message}")))
            }
            _ => {
                let message = error_message(response.text().unwrap_or_default());
                Err(VerifyError::Backend(format!("{resource}: {status}: {message}")))
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses an endpoint base URL.
fn parse_endpoint(label: &str, raw: &str) -> Result<Url, VerifyError> {
    let url = Url::parse(raw).map_err(|err| VerifyError::Backend(format!("invalid {label} endpoint: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(VerifyError::Backend(format!("{label} endpoint must use http or https")));
    }
    Ok(url)
}

/// Appends percent-encoded path segments to `base`.
fn with_segments(base: &Url, segments: &[&str]) -> Result<Url, VerifyError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| VerifyError::Backend(format!("endpoint {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Extracts `error.message` from a Google API error body, falling back to
/// the raw text.
fn error_message(body: String) -> String {
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| value.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);
    let trimmed = message.trim();
    if trimmed.len() <= MAX_ERROR_MESSAGE {
        return trimmed.to_string();
    }
    let mut end = MAX_ERROR_MESSAGE;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[.. end])
}

// ============================================================================
// SECTION: Tests
// ============================================================================
