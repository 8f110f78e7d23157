// crates/infra-probe-core/src/patterns.rs
// ============================================================================
// Module: Expected-Error Patterns
// Description: Glob-style patterns matched against provisioning failures.
// Purpose: Let negative test cases declare which failure text they expect.
// Dependencies: regex, serde
// ============================================================================

//! ## Overview
//! Patterns use glob syntax: `*` matches any run of characters (newlines
//! included), `?` matches exactly one character, and everything else is
//! literal. A pattern must match the whole error text, so a substring check is
//! written `*needle*`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use regex::Regex;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pattern compilation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid error pattern `{pattern}`: {reason}")]
pub struct PatternError {
    /// Source pattern.
    pub pattern: String,
    /// Compilation failure detail.
    pub reason: String,
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Compiled glob pattern.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    /// Pattern as written.
    source: String,
    /// Anchored regex equivalent.
    regex: Regex,
}

impl ErrorPattern {
    /// Compiles a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when the pattern is empty or does not compile.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError {
                pattern: pattern.to_string(),
                reason: "pattern must not be empty".to_string(),
            });
        }
        let regex = Regex::new(&glob_to_regex(pattern)).map_err(|err| PatternError {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true when the pattern matches the entire text.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for ErrorPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ErrorPattern {}

impl fmt::Display for ErrorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for ErrorPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for ErrorPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Returns the first pattern matching `text`, if any.
#[must_use]
pub fn first_match<'a>(patterns: &'a [ErrorPattern], text: &str) -> Option<&'a ErrorPattern> {
    patterns.iter().find(|pattern| pattern.matches(text))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Translates glob syntax into an anchored, dot-matches-newline regex.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("(?s)^");
    let mut literal = String::new();
    for ch in pattern.chars() {
        match ch {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if ch == '*' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
