// crates/infra-probe-core/src/tool.rs
// ============================================================================
// Module: Provisioning Tool Interface
// Description: Backend-agnostic seam for the external provisioning tool.
// Purpose: Decouple the test lifecycle from how Terraform is invoked.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The harness drives the provisioning tool one [`ToolStep`] at a time through
//! [`ProvisioningTool::run`]. The Terraform CLI implementation lives in
//! [`crate::terraform`]; tests substitute scripted fakes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::context::TestContext;

// ============================================================================
// SECTION: Steps
// ============================================================================

/// One invocation of the provisioning tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStep {
    /// Initialise providers and backend.
    Init,
    /// Validate configuration syntax.
    Validate,
    /// Compute an execution plan.
    Plan,
    /// Create or update resources.
    Apply,
    /// Read declared outputs as JSON.
    Output,
    /// Destroy previously created resources.
    Destroy,
}

impl ToolStep {
    /// Returns a stable label for the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Validate => "validate",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Output => "output",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for ToolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Captured process output of a single step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutput {
    /// Returns stdout followed by stderr, the text failures are matched against.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Provisioning tool failures.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The tool process could not be started.
    #[error("terraform {step} could not start: {reason}")]
    Spawn {
        /// Step being executed.
        step: ToolStep,
        /// Launch failure detail.
        reason: String,
    },
    /// The tool did not finish before its deadline and was killed.
    #[error("terraform {step} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// Step being executed.
        step: ToolStep,
        /// Deadline that expired.
        timeout: Duration,
        /// Output captured before the process was killed.
        output: ToolOutput,
    },
    /// The tool exited unsuccessfully.
    #[error("terraform {step} failed ({}): {}", exit_label(.code), failure_summary(.output))]
    Failed {
        /// Step being executed.
        step: ToolStep,
        /// Exit code when the process was not killed by a signal.
        code: Option<i32>,
        /// Captured output.
        output: ToolOutput,
    },
    /// The tool succeeded but its output could not be interpreted.
    #[error("terraform {step} output could not be decoded: {reason}")]
    Decode {
        /// Step being executed.
        step: ToolStep,
        /// Decode failure detail.
        reason: String,
    },
}

impl ToolError {
    /// Returns the step that failed.
    #[must_use]
    pub const fn step(&self) -> ToolStep {
        match self {
            Self::Spawn {
                step, ..
            }
            | Self::Timeout {
                step, ..
            }
            | Self::Failed {
                step, ..
            }
            | Self::Decode {
                step, ..
            } => *step,
        }
    }

    /// Returns the full failure text used for retry and expected-error matching.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Failed {
                output, ..
            } => output.combined(),
            Self::Timeout {
                output, ..
            } => format!("{self}\n{}", output.combined()),
            Self::Spawn {
                ..
            }
            | Self::Decode {
                ..
            } => self.to_string(),
        }
    }
}

/// Formats an exit code for error messages.
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |code| format!("exit code {code}"))
}

/// Picks the most informative line of a failed step's output.
fn failure_summary(output: &ToolOutput) -> String {
    let text = output.combined();
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let first_error = text
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("Error:") || line.starts_with("│ Error:"));
    first_error
        .map(|line| line.trim_start_matches('│').trim().to_string())
        .or_else(|| lines.next_back().map(str::to_string))
        .unwrap_or_else(|| "no output".to_string())
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// External provisioning tool driven by the harness.
pub trait ProvisioningTool: Send + Sync {
    /// Runs one step against the context's module and variables.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the step cannot start, times out, or fails.
    fn run(&self, step: ToolStep, ctx: &TestContext) -> Result<ToolOutput, ToolError>;
}

impl<T: ProvisioningTool + ?Sized> ProvisioningTool for std::sync::Arc<T> {
    fn run(&self, step: ToolStep, ctx: &TestContext) -> Result<ToolOutput, ToolError> {
        (**self).run(step, ctx)
    }
}
