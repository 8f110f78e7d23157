// crates/infra-probe-core/src/terraform.rs
// ============================================================================
// Module: Terraform CLI Driver
// Description: ProvisioningTool implementation that shells out to terraform.
// Purpose: Run init/validate/plan/apply/output/destroy with bounded runtime.
// Dependencies: std::process, which
// ============================================================================

//! ## Overview
//! Each step runs `terraform` in the module directory with input prompts and
//! colour disabled. Stdout and stderr are drained on background threads so a
//! chatty process cannot block on a full pipe. A process that outlives its
//! step timeout is killed and reported as [`ToolError::Timeout`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::context::TestContext;
use crate::tool::ProvisioningTool;
use crate::tool::ToolError;
use crate::tool::ToolOutput;
use crate::tool::ToolStep;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default terraform executable name.
pub const DEFAULT_TERRAFORM_BINARY: &str = "terraform";
/// Default per-step timeout.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Interval between child exit polls.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long to wait for output after killing an overdue process.
const KILL_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Terraform invocation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerraformSettings {
    /// Executable path or name resolved through `PATH`.
    pub binary: PathBuf,
    /// Maximum runtime of a single step.
    pub timeout: Duration,
    /// Extra environment passed to every step.
    pub env: BTreeMap<String, String>,
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_TERRAFORM_BINARY),
            timeout: DEFAULT_STEP_TIMEOUT,
            env: BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Terraform CLI driver.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    /// Invocation settings.
    settings: TerraformSettings,
}

impl TerraformCli {
    /// Creates a driver with the given settings.
    #[must_use]
    pub const fn new(settings: TerraformSettings) -> Self {
        Self {
            settings,
        }
    }

    /// Creates a driver after resolving the binary to an executable path.
    ///
    /// A bare name is searched on `PATH`; a path must name an executable file.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Spawn`] when no executable is found.
    pub fn resolve(mut settings: TerraformSettings) -> Result<Self, ToolError> {
        settings.binary = locate(&settings.binary)?;
        Ok(Self::new(settings))
    }

    /// Returns the settings in use.
    #[must_use]
    pub const fn settings(&self) -> &TerraformSettings {
        &self.settings
    }

    /// Returns the argument list for `step`.
    #[must_use]
    pub fn args_for(step: ToolStep, ctx: &TestContext) -> Vec<String> {
        let fixed: &[&str] = match step {
            ToolStep::Init => &["init", "-input=false", "-upgrade=false", "-no-color"],
            ToolStep::Validate => &["validate", "-no-color"],
            ToolStep::Plan => &["plan", "-input=false", "-lock=false", "-no-color"],
            ToolStep::Apply => &["apply", "-input=false", "-auto-approve", "-lock=true", "-no-color"],
            ToolStep::Output => &["output", "-no-color", "-json"],
            ToolStep::Destroy => &["destroy", "-input=false", "-auto-approve", "-lock=true", "-no-color"],
        };
        let mut args: Vec<String> = fixed.iter().map(|arg| (*arg).to_string()).collect();
        if matches!(step, ToolStep::Plan | ToolStep::Apply | ToolStep::Destroy) {
            args.extend(ctx.variables().to_cli_args());
        }
        args
    }
}

impl ProvisioningTool for TerraformCli {
    fn run(&self, step: ToolStep, ctx: &TestContext) -> Result<ToolOutput, ToolError> {
        let mut command = Command::new(&self.settings.binary);
        command
            .args(Self::args_for(step, ctx))
            .current_dir(ctx.module().path())
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .envs(&self.settings.env);
        run_with_deadline(command, step, self.settings.timeout)
    }
}

// ============================================================================
// SECTION: Process Helpers
// ============================================================================

/// Resolves a terraform executable through `PATH`.
fn locate(binary: &Path) -> Result<PathBuf, ToolError> {
    which::which(binary).map_err(|err| ToolError::Spawn {
        step: ToolStep::Init,
        reason: format!("{} not found: {err}", binary.display()),
    })
}

/// Spawns `command`, drains its output, and enforces `timeout`.
fn run_with_deadline(
    mut command: Command,
    step: ToolStep,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|err| ToolError::Spawn {
        step,
        reason: err.to_string(),
    })?;
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);
    let deadline = Instant::now().checked_add(timeout);

    let status: Result<Option<ExitStatus>, String> = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Ok(Some(status)),
            Ok(None) if deadline.is_some_and(|deadline| Instant::now() >= deadline) => {
                let _ = child.kill();
                let _ = child.wait();
                break Ok(None);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                break Err(format!("wait failed: {err}"));
            }
        }
    };

    // Orphaned grandchildren can hold the pipes open after a kill.
    let grace = if matches!(status, Ok(Some(_))) { None } else { Some(KILL_GRACE) };
    let output = ToolOutput {
        stdout: collect_reader(stdout, grace),
        stderr: collect_reader(stderr, grace),
    };
    match status {
        Err(reason) => Err(ToolError::Spawn {
            step,
            reason,
        }),
        Ok(None) => Err(ToolError::Timeout {
            step,
            timeout,
            output,
        }),
        Ok(Some(status)) if status.success() => Ok(output),
        Ok(Some(status)) => Err(ToolError::Failed {
            step,
            code: status.code(),
            output,
        }),
    }
}

/// Reads a pipe to completion on a background thread.
fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        let _ = sender.send(String::from_utf8_lossy(&buffer).into_owned());
    });
    receiver
}

/// Collects a reader's text, waiting at most `grace` when one is given.
fn collect_reader(receiver: Option<Receiver<String>>, grace: Option<Duration>) -> String {
    let Some(receiver) = receiver else {
        return String::new();
    };
    match grace {
        Some(grace) => receiver.recv_timeout(grace).unwrap_or_default(),
        None => receiver.recv().unwrap_or_default(),
    }
}
