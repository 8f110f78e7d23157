// crates/infra-probe-core/src/harness.rs
// ============================================================================
// Module: Provisioning Test Harness
// Description: Prepare, apply, verify, and guaranteed teardown for one case.
// Purpose: Drive a test case through its lifecycle and never leak resources.
// Dependencies: crate::{context, events, retry, tool, verify}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`Harness::run`] walks a case through `Prepared -> Applied -> Verified ->
//! Destroyed`. A [`TeardownGuard`] is armed before apply starts and is released
//! exactly once: explicitly on every normal path, or from `Drop` when a
//! verification closure panics. The only path that skips teardown is a
//! negative case whose apply failure matched an expected-error pattern.
//!
//! Cases that share a module directory run one at a time: the module lock is
//! held from apply through teardown. A negative case's failure that matches
//! an expected pattern is final and is never retried as transient.
//!
//! Failures surface as [`CaseFailure`]. A teardown failure is attached next to
//! the primary error and never replaces it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::assertions::check_all;
use crate::case::ResourceCheck;
use crate::case::TestCase;
use crate::context::PrepareError;
use crate::context::TestContext;
use crate::events::EventSink;
use crate::events::HarnessEvent;
use crate::events::NoopEventSink;
use crate::naming::NamingConfig;
use crate::outputs::Outputs;
use crate::module_lock::ModuleLocks;
use crate::patterns::ErrorPattern;
use crate::patterns::first_match;
use crate::retry::run_with_retry_unless;
use crate::tool::ProvisioningTool;
use crate::tool::ToolError;
use crate::tool::ToolOutput;
use crate::tool::ToolStep;
use crate::verify::ResourceKind;
use crate::verify::ResourceVerifier;
use crate::verify::VerifyError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder rendered for sensitive outputs in reports.
const REDACTED: &str = "<sensitive>";

// ============================================================================
// SECTION: Phases and Outcomes
// ============================================================================

/// Lifecycle state of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePhase {
    /// Names generated and variables bound.
    Prepared,
    /// Apply finished successfully.
    Applied,
    /// Every assertion and existence check passed.
    Verified,
    /// Teardown completed.
    Destroyed,
    /// Negative case whose apply failed as expected; nothing to destroy.
    FailedBeforeApply,
}

/// Final verdict of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    /// Applied, verified, and destroyed.
    Passed,
    /// Negative case whose apply failure matched an expected pattern.
    ExpectedFailure,
    /// Any other result.
    Failed,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure of the initialise-and-apply sequence or the output read.
#[derive(Debug, Clone, Error)]
#[error("apply failed: {0}")]
pub struct ApplyError(#[from] pub ToolError);

impl ApplyError {
    /// Returns the underlying tool error.
    #[must_use]
    pub const fn tool_error(&self) -> &ToolError {
        &self.0
    }

    /// Returns the text matched against expected-error patterns.
    #[must_use]
    pub fn text(&self) -> String {
        self.0.text()
    }
}

/// Primary reason a case failed.
#[derive(Debug, Clone, Error)]
pub enum CaseError {
    /// Prepare rejected the case before anything was provisioned.
    #[error("prepare failed: {0}")]
    Prepare(#[from] PrepareError),
    /// Apply or output retrieval failed without matching an expected error.
    #[error(transparent)]
    Apply(ApplyError),
    /// A negative case applied successfully.
    #[error("apply succeeded but a failure matching one of [{}] was expected", .patterns.join(", "))]
    UnexpectedSuccess {
        /// Expected-error patterns that were never exercised.
        patterns: Vec<String>,
    },
    /// One or more assertions or existence checks failed.
    #[error("verification failed: {}", .0.join("; "))]
    Verification(Vec<String>),
    /// Teardown failed after an otherwise passing case.
    #[error("teardown failed: {0}")]
    Teardown(ToolError),
    /// The case task ended without producing a result.
    #[error("case aborted: {0}")]
    Aborted(String),
}

/// Failed case with its report and any teardown failure.
#[derive(Debug, Clone)]
pub struct CaseFailure {
    /// First failure of the case.
    pub primary: CaseError,
    /// Teardown failure that followed the primary failure, if any.
    pub teardown: Option<ToolError>,
    /// Report of everything that happened before the failure.
    pub report: CaseReport,
}

impl CaseFailure {
    /// Builds a failure for a case whose execution was cut short.
    #[must_use]
    pub fn aborted(case: &TestCase, reason: impl Into<String>) -> Self {
        let primary = CaseError::Aborted(reason.into());
        let mut report = CaseReport::new(case);
        report.error = Some(primary.to_string());
        Self {
            primary,
            teardown: None,
            report,
        }
    }
}

impl fmt::Display for CaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case `{}` failed: {}", self.report.case, self.primary)?;
        if let Some(teardown) = &self.teardown {
            write!(f, " (teardown also failed, resources may have leaked: {teardown})")?;
        }
        Ok(())
    }
}

impl std::error::Error for CaseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.primary)
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Record of one case execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    /// Case name.
    pub case: String,
    /// Module directory as given.
    pub module: String,
    /// Final verdict.
    pub outcome: CaseOutcome,
    /// Phases entered, in order.
    pub phases: Vec<CasePhase>,
    /// Generated names keyed by variable.
    pub unique_names: BTreeMap<String, String>,
    /// Rendered outputs with sensitive values redacted.
    pub outputs: BTreeMap<String, String>,
    /// Expected-error pattern that matched, for negative cases.
    pub matched_error: Option<String>,
    /// Primary failure message.
    pub error: Option<String>,
    /// Teardown failure message.
    pub teardown_error: Option<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl CaseReport {
    /// Starts a report for `case`.
    fn new(case: &TestCase) -> Self {
        Self {
            case: case.name.clone(),
            module: case.module.to_string(),
            outcome: CaseOutcome::Failed,
            phases: Vec::new(),
            unique_names: BTreeMap::new(),
            outputs: BTreeMap::new(),
            matched_error: None,
            error: None,
            teardown_error: None,
            duration_ms: 0,
        }
    }

    /// Returns true when the case passed or failed as expected.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed | CaseOutcome::ExpectedFailure)
    }

    /// Returns true when `phase` was entered.
    #[must_use]
    pub fn reached(&self, phase: CasePhase) -> bool {
        self.phases.contains(&phase)
    }

    /// Copies generated names from the context.
    fn record_names(&mut self, ctx: &TestContext) {
        self.unique_names = ctx
            .unique_names()
            .map(|(variable, name)| (variable.to_string(), name.as_str().to_string()))
            .collect();
    }

    /// Copies rendered outputs, redacting sensitive ones.
    fn record_outputs(&mut self, outputs: &Outputs) {
        self.outputs = outputs
            .names()
            .map(|name| {
                let value = if outputs.is_sensitive(name) {
                    REDACTED.to_string()
                } else {
                    outputs.get_string(name).unwrap_or_default()
                };
                (name.to_string(), value)
            })
            .collect();
    }
}

// ============================================================================
// SECTION: Applied Case View
// ============================================================================

/// Read-only view handed to custom verification closures.
pub struct AppliedCase<'a> {
    /// Prepared context.
    context: &'a TestContext,
    /// Apply outputs.
    outputs: &'a Outputs,
    /// Provider verifier, when configured.
    verifier: Option<&'a dyn ResourceVerifier>,
}

impl AppliedCase<'_> {
    /// Returns the prepared context.
    #[must_use]
    pub const fn context(&self) -> &TestContext {
        self.context
    }

    /// Returns the apply outputs.
    #[must_use]
    pub const fn outputs(&self) -> &Outputs {
        self.outputs
    }

    /// Returns an output rendered as a string.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<String> {
        self.outputs.get_string(name)
    }

    /// Returns the string value of a variable.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.context.var_str(name)
    }

    /// Confirms a resource named by `name_variable` exists in the case project.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] when the resource is absent, the variable is
    /// unbound, or no verifier is configured.
    pub fn verify_exists(&self, kind: ResourceKind, name_variable: &str) -> Result<(), VerifyError> {
        let check = ResourceCheck {
            kind,
            name_variable: name_variable.to_string(),
            project_variable: crate::case::PROJECT_ID_VARIABLE.to_string(),
        };
        verify_check(self.verifier, self.context, &check)
    }
}

/// Resolves and runs one existence check.
fn verify_check(
    verifier: Option<&dyn ResourceVerifier>,
    ctx: &TestContext,
    check: &ResourceCheck,
) -> Result<(), VerifyError> {
    let resource = ctx.resolve(check)?;
    let Some(verifier) = verifier else {
        return Err(VerifyError::Backend(format!("no resource verifier configured for {resource}")));
    };
    verifier.verify_exists(&resource)
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Lifecycle driver for test cases.
pub struct Harness<T> {
    /// Provisioning tool.
    tool: T,
    /// Name generation settings.
    naming: NamingConfig,
    /// Event destination.
    sink: Arc<dyn EventSink>,
    /// Provider verifier for existence checks.
    verifier: Option<Arc<dyn ResourceVerifier>>,
    /// Per-module exclusion for concurrent cases.
    locks: ModuleLocks,
}

impl<T: ProvisioningTool> Harness<T> {
    /// Creates a harness with default naming, no events, and no verifier.
    #[must_use]
    pub fn new(tool: T) -> Self {
        Self {
            tool,
            naming: NamingConfig::default(),
            sink: Arc::new(NoopEventSink),
            verifier: None,
            locks: ModuleLocks::new(),
        }
    }

    /// Sets the naming configuration.
    #[must_use]
    pub fn with_naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the provider verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn ResourceVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Returns the provisioning tool.
    #[must_use]
    pub const fn tool(&self) -> &T {
        &self.tool
    }

    /// Returns the naming configuration.
    #[must_use]
    pub const fn naming(&self) -> &NamingConfig {
        &self.naming
    }

    /// Generates names and binds variables for `case`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepareError`] when the case cannot be bound.
    pub fn prepare(&self, case: &TestCase) -> Result<TestContext, PrepareError> {
        TestContext::prepare(case, &self.naming)
    }

    /// Runs init and apply, then reads the outputs.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] carrying the tool's output text.
    pub fn apply(&self, ctx: &TestContext) -> Result<Outputs, ApplyError> {
        self.apply_resources(ctx, &[])?;
        self.read_outputs(ctx)
    }

    /// Confirms a resource exists through the configured verifier.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] when the resource is absent or cannot be read.
    pub fn verify_exists(&self, ctx: &TestContext, check: &ResourceCheck) -> Result<(), VerifyError> {
        verify_check(self.verifier.as_deref(), ctx, check)
    }

    /// Runs init and validate, returning validate's stdout.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when either step fails.
    pub fn validate(&self, ctx: &TestContext) -> Result<String, ToolError> {
        self.step(ctx, ToolStep::Init)?;
        self.step(ctx, ToolStep::Validate).map(|output| output.stdout)
    }

    /// Runs init and plan, returning plan's stdout.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when either step fails.
    pub fn plan(&self, ctx: &TestContext) -> Result<String, ToolError> {
        self.step(ctx, ToolStep::Init)?;
        self.step(ctx, ToolStep::Plan).map(|output| output.stdout)
    }

    /// Destroys everything the context's module created.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when destroy fails after retries.
    pub fn teardown(&self, ctx: &TestContext) -> Result<(), ToolError> {
        let result = self.step(ctx, ToolStep::Destroy).map(|_| ());
        if let Err(err) = &result {
            self.sink.record(&HarnessEvent::teardown_failed(ctx.case_name(), err.to_string()));
        }
        result
    }

    /// Runs the declarative checks of `case` against apply outputs.
    #[must_use]
    pub fn verify(&self, case: &TestCase, ctx: &TestContext, outputs: &Outputs) -> Vec<String> {
        let mut failures = check_all(&case.expected_outputs, outputs, ctx.variables());
        for check in &case.resource_checks {
            if let Err(err) = self.verify_exists(ctx, check) {
                failures.push(err.to_string());
            }
        }
        failures
    }

    /// Runs `case` using only its declarative checks.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure`] when the case fails.
    pub fn run_case(&self, case: &TestCase) -> Result<CaseReport, CaseFailure> {
        self.run(case, |_| Ok(()))
    }

    /// Runs `case` through its full lifecycle.
    ///
    /// `verify` runs after the declarative checks; its error is reported
    /// alongside theirs. If it panics, the armed guard still tears down before
    /// the panic continues.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure`] when the case fails.
    pub fn run<F>(&self, case: &TestCase, verify: F) -> Result<CaseReport, CaseFailure>
    where
        F: FnOnce(&AppliedCase<'_>) -> Result<(), String>,
    {
        let started = Instant::now();
        let mut report = CaseReport::new(case);

        let ctx = match self.prepare(case) {
            Ok(ctx) => ctx,
            Err(err) => return Err(Self::fail(report, started, CaseError::Prepare(err), None)),
        };
        report.record_names(&ctx);
        self.enter(&mut report, CasePhase::Prepared, None);

        self.locks.with_module(ctx.module().path(), || self.run_prepared(case, &ctx, report, started, verify))
    }

    /// Applies, verifies, and tears down a prepared case.
    fn run_prepared<F>(
        &self,
        case: &TestCase,
        ctx: &TestContext,
        mut report: CaseReport,
        started: Instant,
        verify: F,
    ) -> Result<CaseReport, CaseFailure>
    where
        F: FnOnce(&AppliedCase<'_>) -> Result<(), String>,
    {
        let guard = TeardownGuard::arm(self, ctx);
        if let Err(err) = self.apply_resources(ctx, &case.expected_errors) {
            if let Some(pattern) = first_match(&case.expected_errors, &err.text()) {
                guard.disarm();
                report.matched_error = Some(pattern.as_str().to_string());
                let message = format!("apply failed as expected (matched `{pattern}`)");
                self.enter(&mut report, CasePhase::FailedBeforeApply, Some(message));
                return Ok(Self::finish(report, started, CaseOutcome::ExpectedFailure));
            }
            let teardown = self.release(&mut report, guard);
            return Err(Self::fail(report, started, CaseError::Apply(err), teardown.err()));
        }
        self.enter(&mut report, CasePhase::Applied, None);

        if case.is_negative() {
            let patterns = case.expected_errors.iter().map(|pattern| pattern.as_str().to_string()).collect();
            let teardown = self.release(&mut report, guard);
            return Err(Self::fail(
                report,
                started,
                CaseError::UnexpectedSuccess {
                    patterns,
                },
                teardown.err(),
            ));
        }

        let outputs = match self.read_outputs(ctx) {
            Ok(outputs) => outputs,
            Err(err) => {
                let teardown = self.release(&mut report, guard);
                return Err(Self::fail(report, started, CaseError::Apply(err), teardown.err()));
            }
        };
        report.record_outputs(&outputs);

        let mut failures = self.verify(case, ctx, &outputs);
        let applied = AppliedCase {
            context: ctx,
            outputs: &outputs,
            verifier: self.verifier.as_deref(),
        };
        if let Err(message) = verify(&applied) {
            failures.push(message);
        }
        if failures.is_empty() {
            self.enter(&mut report, CasePhase::Verified, None);
        }

        let teardown = self.release(&mut report, guard);
        match (failures.is_empty(), teardown) {
            (true, Ok(())) => Ok(Self::finish(report, started, CaseOutcome::Passed)),
            (true, Err(err)) => Err(Self::fail(report, started, CaseError::Teardown(err), None)),
            (false, teardown) => {
                Err(Self::fail(report, started, CaseError::Verification(failures), teardown.err()))
            }
        }
    }

    /// Runs init then apply, each under the context's retry policy.
    ///
    /// A failure matching one of `expected` is returned without retrying.
    fn apply_resources(&self, ctx: &TestContext, expected: &[ErrorPattern]) -> Result<(), ApplyError> {
        let settled = |err: &ToolError| first_match(expected, &err.text()).is_some();
        self.step_unless(ctx, ToolStep::Init, settled)?;
        self.step_unless(ctx, ToolStep::Apply, settled)?;
        Ok(())
    }

    /// Reads and decodes `terraform output -json`.
    fn read_outputs(&self, ctx: &TestContext) -> Result<Outputs, ApplyError> {
        let output = self.step(ctx, ToolStep::Output)?;
        Outputs::from_terraform_json(&output.stdout).map_err(|err| {
            ApplyError(ToolError::Decode {
                step: ToolStep::Output,
                reason: err.to_string(),
            })
        })
    }

    /// Runs one tool step under the retry policy, emitting step events.
    fn step(&self, ctx: &TestContext, step: ToolStep) -> Result<ToolOutput, ToolError> {
        self.step_unless(ctx, step, |_| false)
    }

    /// Runs one tool step, returning at once on failures `settled` accepts.
    fn step_unless(
        &self,
        ctx: &TestContext,
        step: ToolStep,
        settled: impl Fn(&ToolError) -> bool,
    ) -> Result<ToolOutput, ToolError> {
        let case = ctx.case_name();
        self.sink.record(&HarnessEvent::step_started(case, step));
        let started = Instant::now();
        let result = run_with_retry_unless(
            ctx.retry(),
            settled,
            |attempt, reason, _err| self.sink.record(&HarnessEvent::retry(case, step, attempt, reason)),
            || self.tool.run(step, ctx),
        );
        match &result {
            Ok(_) => self.sink.record(&HarnessEvent::step_finished(case, step, started.elapsed())),
            Err(err) => self.sink.record(&HarnessEvent::step_failed(case, step, err.to_string())),
        }
        result
    }

    /// Releases the guard and records the `Destroyed` phase on success.
    fn release(&self, report: &mut CaseReport, guard: TeardownGuard<'_, T>) -> Result<(), ToolError> {
        let result = guard.release();
        if result.is_ok() {
            self.enter(report, CasePhase::Destroyed, None);
        }
        result
    }

    /// Records a phase transition in the report and the event sink.
    fn enter(&self, report: &mut CaseReport, phase: CasePhase, message: Option<String>) {
        report.phases.push(phase);
        self.sink.record(&HarnessEvent::phase(&report.case, phase, message));
    }

    /// Completes a successful report.
    fn finish(mut report: CaseReport, started: Instant, outcome: CaseOutcome) -> CaseReport {
        report.outcome = outcome;
        report.duration_ms = elapsed_ms(started);
        report
    }

    /// Completes a failed report and wraps it with its errors.
    fn fail(
        mut report: CaseReport,
        started: Instant,
        primary: CaseError,
        teardown: Option<ToolError>,
    ) -> CaseFailure {
        report.outcome = CaseOutcome::Failed;
        report.duration_ms = elapsed_ms(started);
        report.error = Some(primary.to_string());
        report.teardown_error = teardown.as_ref().map(ToString::to_string);
        CaseFailure {
            primary,
            teardown,
            report,
        }
    }
}

/// Milliseconds since `started`, saturating.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Teardown Guard
// ============================================================================

/// Scoped teardown obligation for one prepared context.
///
/// Dropping an armed guard runs teardown and discards its result, which has
/// already been reported to the event sink.
#[must_use = "dropping the guard tears the case down immediately"]
pub struct TeardownGuard<'a, T: ProvisioningTool> {
    /// Harness that performs teardown.
    harness: &'a Harness<T>,
    /// Context to destroy.
    ctx: &'a TestContext,
    /// Whether teardown is still owed.
    armed: bool,
}

impl<'a, T: ProvisioningTool> TeardownGuard<'a, T> {
    /// Arms a guard for `ctx`.
    pub const fn arm(harness: &'a Harness<T>, ctx: &'a TestContext) -> Self {
        Self {
            harness,
            ctx,
            armed: true,
        }
    }

    /// Returns true while teardown is still owed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Runs teardown now.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when destroy fails.
    pub fn release(mut self) -> Result<(), ToolError> {
        self.armed = false;
        self.harness.teardown(self.ctx)
    }

    /// Drops the obligation without tearing down.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T: ProvisioningTool> Drop for TeardownGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.armed = false;
            let _ = self.harness.teardown(self.ctx);
        }
    }
}
