// crates/infra-probe-core/src/verify.rs
// ============================================================================
// Module: Resource Verification
// Description: Seam for confirming provisioned resources through provider read APIs.
// Purpose: Keep cloud SDK details out of the lifecycle runner.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`ResourceVerifier`] answers one question: does a resource of a given kind
//! and name exist in a project? The GCP implementation lives in the
//! `infra-probe-gcp` crate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Kinds of resources the harness can confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Cloud Storage bucket.
    StorageBucket,
    /// Pub/Sub topic.
    PubsubTopic,
}

impl ResourceKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StorageBucket => "storage_bucket",
            Self::PubsubTopic => "pubsub_topic",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved resource identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Owning project.
    pub project: String,
    /// Resource name.
    pub name: String,
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.project, self.name)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The provider reports the resource does not exist.
    #[error("{0} not found")]
    NotFound(ResourceId),
    /// Credentials could not be obtained or were rejected.
    #[error("credentials unavailable: {0}")]
    Credentials(String),
    /// The provider API failed or returned an unexpected response.
    #[error("provider read failed: {0}")]
    Backend(String),
    /// A check referenced a variable the context does not define.
    #[error("check references unknown variable `{0}`")]
    UnknownVariable(String),
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Provider read API used to confirm materialized resources.
pub trait ResourceVerifier: Send + Sync {
    /// Confirms that the resource exists.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::NotFound`] when the resource is absent, or another
    /// variant when the provider cannot be queried.
    fn verify_exists(&self, resource: &ResourceId) -> Result<(), VerifyError>;
}
