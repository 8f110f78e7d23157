// crates/infra-probe-core/src/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Bounded retries for transient provisioning failures.
// Purpose: Absorb eventual-consistency errors without masking real failures.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! A failed step is retried only when its output matches one of the policy's
//! regexes. Each retry waits a fixed delay, and at most `max_retries` extra
//! attempts follow the first one. Launch failures, timeouts, and decode errors
//! are never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use regex::Regex;

use crate::patterns::PatternError;
use crate::tool::ToolError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Retry count used by [`RetryPolicy::eventual_consistency`].
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Delay used by [`RetryPolicy::eventual_consistency`].
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Description attached to the catch-all eventual-consistency pattern.
pub const EVENTUAL_CONSISTENCY_REASON: &str = "Retrying due to eventual consistency";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Regex that marks a failure as transient, with a human-readable reason.
#[derive(Debug, Clone)]
pub struct RetryablePattern {
    /// Compiled matcher.
    regex: Regex,
    /// Reason reported when the pattern triggers a retry.
    description: String,
}

impl RetryablePattern {
    /// Compiles a retryable pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when the regex is invalid.
    pub fn new(pattern: &str, description: impl Into<String>) -> Result<Self, PatternError> {
        let regex = Regex::new(pattern).map_err(|err| PatternError {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            regex,
            description: description.into(),
        })
    }

    /// Returns the regex source.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns the retry reason.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Retry policy applied to init, apply, and destroy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Patterns that classify a failure as transient.
    patterns: Vec<RetryablePattern>,
    /// Extra attempts allowed after the first.
    max_retries: u32,
    /// Fixed wait between attempts.
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Builds a policy from explicit parts.
    #[must_use]
    pub const fn new(patterns: Vec<RetryablePattern>, max_retries: u32, delay: Duration) -> Self {
        Self {
            patterns,
            max_retries,
            delay,
        }
    }

    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(Vec::new(), 0, Duration::ZERO)
    }

    /// Treats every failure as transient: three retries, five seconds apart.
    #[must_use]
    pub fn eventual_consistency() -> Self {
        let patterns = RetryablePattern::new(".*", EVENTUAL_CONSISTENCY_REASON).into_iter().collect();
        Self::new(patterns, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY)
    }

    /// Returns the configured patterns.
    #[must_use]
    pub fn patterns(&self) -> &[RetryablePattern] {
        &self.patterns
    }

    /// Returns the number of extra attempts allowed.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the retry reason when `err` is transient under this policy.
    #[must_use]
    pub fn retry_reason(&self, err: &ToolError) -> Option<&str> {
        if !matches!(err, ToolError::Failed { .. }) {
            return None;
        }
        let text = err.text();
        self.patterns
            .iter()
            .find(|pattern| pattern.regex.is_match(&text))
            .map(RetryablePattern::description)
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Runs `op` until it succeeds, fails fatally, or the retry budget is spent.
///
/// `on_retry` is called with the 1-based retry number, the matched reason, and
/// the failure before each wait.
///
/// # Errors
///
/// Returns the last [`ToolError`] when the operation never succeeds.
pub fn run_with_retry<T, R, F>(policy: &RetryPolicy, on_retry: R, op: F) -> Result<T, ToolError>
where
    R: FnMut(u32, &str, &ToolError),
    F: FnMut() -> Result<T, ToolError>,
{
    run_with_retry_unless(policy, |_| false, on_retry, op)
}

/// Like [`run_with_retry`], but a failure for which `settled` returns true is
/// returned at once even when the policy would retry it.
///
/// # Errors
///
/// Returns the settled or last [`ToolError`] when the operation never succeeds.
pub fn run_with_retry_unless<T, S, R, F>(
    policy: &RetryPolicy,
    settled: S,
    mut on_retry: R,
    mut op: F,
) -> Result<T, ToolError>
where
    S: Fn(&ToolError) -> bool,
    R: FnMut(u32, &str, &ToolError),
    F: FnMut() -> Result<T, ToolError>,
{
    let mut retries = 0u32;
    loop {
        let err = match op() {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if settled(&err) {
            return Err(err);
        }
        let Some(reason) = policy.retry_reason(&err) else {
            return Err(err);
        };
        if retries >= policy.max_retries {
            return Err(err);
        }
        retries = retries.saturating_add(1);
        on_retry(retries, reason, &err);
        if !policy.delay.is_zero() {
            std::thread::sleep(policy.delay);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
