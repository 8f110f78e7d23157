// crates/infra-probe-gcp/src/lib.rs
// ============================================================================
// Module: Infra Probe GCP Library
// Description: Google Cloud read API for provisioned resource checks.
// Purpose: Implement the harness resource verifier for GCS and Pub/Sub.
// Dependencies: infra-probe-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! `infra-probe-gcp` confirms that resources created by a Terraform apply
//! exist, by reading them back through the Cloud Storage JSON API and the
//! Pub/Sub REST API. It authenticates with a bearer token from a static value,
//! an environment variable, or the `gcloud` CLI.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod token;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use token::TokenProvider;
pub use token::TokenSource;
pub use verifier::DEFAULT_PUBSUB_ENDPOINT;
pub use verifier::DEFAULT_REQUEST_TIMEOUT;
pub use verifier::DEFAULT_STORAGE_ENDPOINT;
pub use verifier::GcpSettings;
pub use verifier::GcpVerifier;
