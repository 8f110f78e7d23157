// crates/infra-probe-config/src/env.rs
// ============================================================================
// Module: Environment Overrides
// Description: Strict readers for infra-probe environment variables.
// Purpose: Let CI override config values without editing TOML.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every override is read with strict UTF-8 handling. A variable that is set
//! but empty is an error rather than being silently ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;

// ============================================================================
// SECTION: Variables
// ============================================================================

/// Environment variables recognised by infra-probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEnv {
    /// Config file path.
    ConfigPath,
    /// Project bound to `project_id` in every case.
    ProjectId,
    /// Terraform executable.
    TerraformBin,
    /// Per-command timeout in seconds.
    TimeoutSec,
    /// Artifact root directory.
    RunRoot,
}

impl ProbeEnv {
    /// Every override applied on top of the config file.
    pub const OVERRIDES: [Self; 4] = [Self::ProjectId, Self::TerraformBin, Self::TimeoutSec, Self::RunRoot];

    /// Returns the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => "INFRA_PROBE_CONFIG",
            Self::ProjectId => "INFRA_PROBE_PROJECT_ID",
            Self::TerraformBin => "INFRA_PROBE_TERRAFORM_BIN",
            Self::TimeoutSec => "INFRA_PROBE_TIMEOUT_SEC",
            Self::RunRoot => "INFRA_PROBE_RUN_ROOT",
        }
    }
}

// ============================================================================
// SECTION: Readers
// ============================================================================

/// Reads an environment variable, rejecting non-UTF-8 values.
///
/// # Errors
///
/// Returns an error message when the value is not valid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    env::var_os(name).map_or(Ok(None), |value| {
        value.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable that must be non-empty when set.
///
/// # Errors
///
/// Returns an error message when the value is not UTF-8 or is blank.
pub fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    let Some(value) = read_env_strict(name)? else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{name} must not be empty"));
    }
    Ok(Some(trimmed.to_string()))
}

/// Parses a positive number of seconds.
///
/// # Errors
///
/// Returns an error message when `raw` is not a positive integer.
pub fn parse_timeout_seconds(name: &str, raw: &str) -> Result<u64, String> {
    let seconds: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{name} must be a positive integer number of seconds"))?;
    if seconds == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(seconds)
}
