// crates/infra-probe-core/src/naming.rs
// ============================================================================
// Module: Unique Resource Names
// Description: Collision-resistant names for cloud resources created by tests.
// Purpose: Let concurrent test runs share a project without name clashes.
// Dependencies: rand, serde, thiserror
// ============================================================================

//! ## Overview
//! Unique names are `<prefix>-<suffix>` where the suffix is drawn from a
//! lowercase base-36 alphabet using the calling thread's RNG. Uniqueness comes
//! from randomness alone; nothing is coordinated between test cases.
//! Bucket names can additionally be checked against the GCS naming rules
//! before any provisioning is attempted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::seq::SliceRandom;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of random characters appended to a prefix.
pub const DEFAULT_SUFFIX_LENGTH: usize = 6;
/// Smallest accepted suffix length.
pub const MIN_SUFFIX_LENGTH: usize = 4;
/// Largest accepted suffix length.
pub const MAX_SUFFIX_LENGTH: usize = 32;
/// Characters used for generated suffixes (safe for bucket and topic names).
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
/// Minimum GCS bucket name length.
const BUCKET_NAME_MIN: usize = 3;
/// Maximum GCS bucket name length (without dots).
const BUCKET_NAME_MAX: usize = 63;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Settings for unique-name generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Number of random characters in each suffix.
    pub suffix_length: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            suffix_length: DEFAULT_SUFFIX_LENGTH,
        }
    }
}

impl NamingConfig {
    /// Validates the suffix length bounds.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::SuffixLength`] when the length is out of range.
    pub const fn validate(&self) -> Result<(), NameError> {
        if self.suffix_length < MIN_SUFFIX_LENGTH || self.suffix_length > MAX_SUFFIX_LENGTH {
            return Err(NameError::SuffixLength(self.suffix_length));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Name generation and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Suffix length outside the accepted range.
    #[error("suffix length {0} must be between {min} and {max}", min = MIN_SUFFIX_LENGTH, max = MAX_SUFFIX_LENGTH)]
    SuffixLength(usize),
    /// Bucket name violates GCS naming rules.
    #[error("invalid bucket name `{name}`: {reason}")]
    InvalidBucketName {
        /// Offending name.
        name: String,
        /// Rule that was violated.
        reason: &'static str,
    },
}

// ============================================================================
// SECTION: Unique Names
// ============================================================================

/// A generated resource name, stable for the lifetime of one test context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueName {
    /// Full rendered name.
    value: String,
    /// Random suffix portion.
    suffix: String,
}

impl UniqueName {
    /// Generates a new name with a fresh random suffix.
    #[must_use]
    pub fn generate(prefix: &str, config: &NamingConfig) -> Self {
        Self::with_suffix(prefix, &random_suffix(config.suffix_length))
    }

    /// Builds a name from an existing suffix (used for names sharing one suffix).
    #[must_use]
    pub fn with_suffix(prefix: &str, suffix: &str) -> Self {
        let value =
            if prefix.is_empty() { suffix.to_string() } else { format!("{prefix}-{suffix}") };
        Self {
            value,
            suffix: suffix.to_string(),
        }
    }

    /// Returns the full name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the random suffix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Consumes the name and returns the rendered string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Display for UniqueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Returns `length` random characters from the lowercase base-36 alphabet.
#[must_use]
pub fn random_suffix(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0 .. length)
        .filter_map(|_| SUFFIX_ALPHABET.choose(&mut rng))
        .map(|byte| char::from(*byte))
        .collect()
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Checks a bucket name against the GCS naming rules.
///
/// # Errors
///
/// Returns [`NameError::InvalidBucketName`] naming the first violated rule.
pub fn validate_bucket_name(name: &str) -> Result<(), NameError> {
    let invalid = |reason| {
        Err(NameError::InvalidBucketName {
            name: name.to_string(),
            reason,
        })
    };
    if name.len() < BUCKET_NAME_MIN || name.len() > BUCKET_NAME_MAX {
        return invalid("length must be between 3 and 63 characters");
    }
    if !name.bytes().all(|b| {
        b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_' | b'.')
    }) {
        return invalid("only lowercase letters, digits, '-', '_' and '.' are allowed");
    }
    let edge_ok = |b: Option<u8>| b.is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if !edge_ok(name.bytes().next()) || !edge_ok(name.bytes().last()) {
        return invalid("must start and end with a letter or digit");
    }
    if name.starts_with("goog") {
        return invalid("must not start with the reserved prefix \"goog\"");
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
