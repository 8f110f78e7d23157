// system-tests/src/settings.rs
// ============================================================================
// Module: Suite Settings
// Description: Environment-backed knobs for system-test runs.
// Purpose: Locate fixture modules and artifact roots, and bound Terraform time.
// Dependencies: infra-probe-config
// ============================================================================

//! ## Overview
//! Values are read through `infra-probe-config`'s strict readers, so a
//! variable that is set but blank or not UTF-8 fails the run instead of
//! falling back to a default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use infra_probe_config::env::parse_timeout_seconds;
use infra_probe_config::read_env_nonempty;

// ============================================================================
// SECTION: Variables
// ============================================================================

/// Environment variables read by the suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteEnv {
    /// Artifact root shared by every test of a run.
    RunRoot,
    /// Directory holding the fixture Terraform modules.
    ModulesDir,
    /// Per-step Terraform timeout in seconds.
    TimeoutSec,
    /// Permit writing into a non-empty artifact directory.
    AllowOverwrite,
}

impl SuiteEnv {
    /// Every suite variable.
    pub const ALL: [Self; 4] = [Self::RunRoot, Self::ModulesDir, Self::TimeoutSec, Self::AllowOverwrite];

    /// Returns the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "INFRA_PROBE_SYSTEM_TEST_RUN_ROOT",
            Self::ModulesDir => "INFRA_PROBE_SYSTEM_TEST_MODULES_DIR",
            Self::TimeoutSec => "INFRA_PROBE_SYSTEM_TEST_TIMEOUT_SEC",
            Self::AllowOverwrite => "INFRA_PROBE_SYSTEM_TEST_ALLOW_OVERWRITE",
        }
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Suite settings resolved from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteSettings {
    /// Artifact root override.
    pub run_root: Option<PathBuf>,
    /// Fixture module directory override.
    pub modules_dir: Option<PathBuf>,
    /// Terraform step timeout override.
    pub timeout: Option<Duration>,
    /// Whether existing artifact directories may be reused.
    pub allow_overwrite: bool,
}

impl SuiteSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first variable that is blank, not UTF-8,
    /// or malformed.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(read_env_nonempty)
    }

    /// Reads settings through `lookup`, which returns a variable's trimmed
    /// value or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns the lookup's error, or a message for a malformed timeout or flag.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Result<Option<String>, String>,
    {
        let read = |var: SuiteEnv| lookup(var.as_str());
        let timeout = match read(SuiteEnv::TimeoutSec)? {
            Some(raw) => Some(Duration::from_secs(parse_timeout_seconds(SuiteEnv::TimeoutSec.as_str(), &raw)?)),
            None => None,
        };
        let allow_overwrite = match read(SuiteEnv::AllowOverwrite)? {
            Some(raw) => parse_flag(SuiteEnv::AllowOverwrite.as_str(), &raw)?,
            None => false,
        };
        Ok(Self {
            run_root: read(SuiteEnv::RunRoot)?.map(PathBuf::from),
            modules_dir: read(SuiteEnv::ModulesDir)?.map(PathBuf::from),
            timeout,
            allow_overwrite,
        })
    }
}

/// Parses `true`, `false`, `1` or `0`.
fn parse_flag(name: &str, raw: &str) -> Result<bool, String> {
    match raw {
        "1" => Ok(true),
        "0" => Ok(false),
        _ if raw.eq_ignore_ascii_case("true") => Ok(true),
        _ if raw.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(format!("{name} must be 1, 0, true, or false")),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
