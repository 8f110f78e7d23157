// crates/infra-probe-gcp/src/token.rs
// ============================================================================
// Module: Access Tokens
// Description: Bearer token sources for the Google REST APIs.
// Purpose: Obtain OAuth access tokens without linking a cloud SDK.
// Dependencies: infra-probe-core, serde
// ============================================================================

//! ## Overview
//! A [`TokenSource`] yields an OAuth access token from one of three places: a
//! literal value, an environment variable, or `gcloud auth print-access-token`.
//! Tokens from `gcloud` are cached for [`GCLOUD_TOKEN_TTL`] so a suite does not
//! fork the CLI once per resource check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use infra_probe_core::VerifyError;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default `gcloud` executable.
pub const DEFAULT_GCLOUD_BINARY: &str = "gcloud";
/// Environment variable read by [`TokenSource::Env`] when none is named.
pub const DEFAULT_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
/// How long a `gcloud` token is reused. Tokens are valid for an hour.
pub const GCLOUD_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

// ============================================================================
// SECTION: Token Source
// ============================================================================

/// Where access tokens come from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case", deny_unknown_fields)]
pub enum TokenSource {
    /// Ask the `gcloud` CLI for the active account's token.
    Gcloud {
        /// `gcloud` executable.
        #[serde(default = "default_gcloud_binary")]
        binary: PathBuf,
    },
    /// Read the token from an environment variable on each request.
    Env {
        /// Variable name.
        #[serde(default = "default_token_env")]
        var: String,
    },
    /// Use a fixed token.
    Static {
        /// Token value.
        token: String,
    },
}

impl Default for TokenSource {
    fn default() -> Self {
        Self::Gcloud {
            binary: default_gcloud_binary(),
        }
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gcloud {
                binary,
            } => f.debug_struct("Gcloud").field("binary", binary).finish(),
            Self::Env {
                var,
            } => f.debug_struct("Env").field("var", var).finish(),
            Self::Static {
                ..
            } => f.debug_struct("Static").field("token", &"<redacted>").finish(),
        }
    }
}

/// Serde default for the gcloud binary.
fn default_gcloud_binary() -> PathBuf {
    PathBuf::from(DEFAULT_GCLOUD_BINARY)
}

/// Serde default for the token variable.
fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Token fetched from `gcloud` and when it was fetched.
struct CachedToken {
    /// Token value.
    value: String,
    /// Fetch time.
    fetched_at: Instant,
}

/// Resolves tokens from a [`TokenSource`], caching `gcloud` results.
pub struct TokenProvider {
    /// Configured source.
    source: TokenSource,
    /// Last `gcloud` token.
    cache: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Creates a provider for `source`.
    #[must_use]
    pub const fn new(source: TokenSource) -> Self {
        Self {
            source,
            cache: Mutex::new(None),
        }
    }

    /// Returns the configured source.
    #[must_use]
    pub const fn source(&self) -> &TokenSource {
        &self.source
    }

    /// Returns a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Credentials`] when no token can be obtained.
    pub fn token(&self) -> Result<String, VerifyError> {
        match &self.source {
            TokenSource::Static {
                token,
            } => non_empty(token.trim(), "static token"),
            TokenSource::Env {
                var,
            } => {
                let raw = env::var_os(var)
                    .ok_or_else(|| VerifyError::Credentials(format!("{var} is not set")))?
                    .into_string()
                    .map_err(|_| VerifyError::Credentials(format!("{var} must be valid UTF-8")))?;
                non_empty(raw.trim(), var)
            }
            TokenSource::Gcloud {
                binary,
            } => self.gcloud_token(binary),
        }
    }

    /// Returns the cached `gcloud` token or fetches a fresh one.
    fn gcloud_token(&self, binary: &Path) -> Result<String, VerifyError> {
        let mut cache =
            self.cache.lock().map_err(|_| VerifyError::Credentials("token cache poisoned".to_string()))?;
        if let Some(cached) = cache.as_ref()
            && cached.fetched_at.elapsed() < GCLOUD_TOKEN_TTL
        {
            return Ok(cached.value.clone());
        }
        let output = Command::new(binary)
            .args(["auth", "print-access-token"])
            .output()
            .map_err(|err| VerifyError::Credentials(format!("failed to run {}: {err}", binary.display())))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VerifyError::Credentials(format!(
                "gcloud auth print-access-token failed: {}",
                stderr.trim()
            )));
        }
        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| VerifyError::Credentials("gcloud token is not valid UTF-8".to_string()))?;
        let value = non_empty(stdout.trim(), "gcloud token")?;
        *cache = Some(CachedToken {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        drop(cache);
        Ok(value)
    }
}

/// Rejects empty tokens.
fn non_empty(value: &str, label: &str) -> Result<String, VerifyError> {
    if value.is_empty() {
        return Err(VerifyError::Credentials(format!("{label} is empty")));
    }
    Ok(value.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
