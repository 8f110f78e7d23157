// crates/infra-probe-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted provisioning tool, recording sinks, and verifiers.
// Purpose: Drive the harness deterministically without Terraform or GCP.
// Dependencies: infra-probe-core, tempfile
// ============================================================================

//! ## Overview
//! [`ScriptedTool`] records every step it is asked to run and replays queued
//! results per step, falling back to success. [`RecordingSink`] captures
//! harness events and [`StaticVerifier`] answers existence checks from a set.
//! [`StatefulTool`] keeps one state per module directory, the way local
//! Terraform state does.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use infra_probe_core::EventSink;
use infra_probe_core::HarnessEvent;
use infra_probe_core::ProvisioningTool;
use infra_probe_core::ResourceId;
use infra_probe_core::ResourceVerifier;
use infra_probe_core::TestContext;
use infra_probe_core::ToolError;
use infra_probe_core::ToolOutput;
use infra_probe_core::ToolStep;
use infra_probe_core::VerifyError;
use tempfile::TempDir;

// ============================================================================
// SECTION: Scripted Tool
// ============================================================================

/// Provisioning tool that replays scripted results.
#[derive(Default)]
pub struct ScriptedTool {
    /// Steps in the order they were run, with the case name.
    calls: Mutex<Vec<(String, ToolStep)>>,
    /// Queued results per step.
    script: Mutex<HashMap<ToolStep, VecDeque<Result<ToolOutput, ToolError>>>>,
    /// Stdout returned by `output` when nothing is scripted.
    outputs_json: Mutex<String>,
    /// Artificial latency applied to apply steps.
    apply_delay: Mutex<Duration>,
    /// Cases currently inside apply.
    in_flight: AtomicUsize,
    /// Highest concurrent apply count observed.
    peak: AtomicUsize,
}

impl ScriptedTool {
    /// Creates a tool where every step succeeds with empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JSON document returned by `terraform output -json`.
    pub fn with_outputs(self, json: &str) -> Self {
        *self.outputs_json.lock().unwrap() = json.to_string();
        self
    }

    /// Makes each apply sleep for `delay`.
    pub fn with_apply_delay(self, delay: Duration) -> Self {
        *self.apply_delay.lock().unwrap() = delay;
        self
    }

    /// Queues a result for the next run of `step`.
    pub fn push(&self, step: ToolStep, result: Result<ToolOutput, ToolError>) {
        self.script.lock().unwrap().entry(step).or_default().push_back(result);
    }

    /// Queues a failure with `stderr` for the next run of `step`.
    pub fn fail(&self, step: ToolStep, stderr: &str) {
        self.push(step, Err(failed(step, stderr)));
    }

    /// Returns every step run so far.
    pub fn steps(&self) -> Vec<ToolStep> {
        self.calls.lock().unwrap().iter().map(|(_, step)| *step).collect()
    }

    /// Returns how many times `step` ran.
    pub fn count(&self, step: ToolStep) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, seen)| *seen == step).count()
    }

    /// Returns how many times `step` ran for `case`.
    pub fn count_for(&self, case: &str, step: ToolStep) -> usize {
        self.calls.lock().unwrap().iter().filter(|(name, seen)| name == case && *seen == step).count()
    }

    /// Returns the highest number of concurrent applies observed.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ProvisioningTool for ScriptedTool {
    fn run(&self, step: ToolStep, ctx: &TestContext) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push((ctx.case_name().to_string(), step));
        if step == ToolStep::Apply {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            let delay = *self.apply_delay.lock().unwrap();
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        let scripted = self.script.lock().unwrap().get_mut(&step).and_then(VecDeque::pop_front);
        if let Some(result) = scripted {
            return result;
        }
        let stdout = match step {
            ToolStep::Output => self.outputs_json.lock().unwrap().clone(),
            ToolStep::Validate => "Success! The configuration is valid.\n".to_string(),
            ToolStep::Plan => "  # google_storage_bucket.bucket will be created\n".to_string(),
            _ => String::new(),
        };
        Ok(ToolOutput {
            stdout,
            stderr: String::new(),
        })
    }
}

/// Builds a non-zero exit failure for `step`.
pub fn failed(step: ToolStep, stderr: &str) -> ToolError {
    ToolError::Failed {
        step,
        code: Some(1),
        output: ToolOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
        },
    }
}

// ============================================================================
// SECTION: Stateful Tool
// ============================================================================

/// Provisioning tool with one bucket of state per module directory.
#[derive(Default)]
pub struct StatefulTool {
    /// Bucket currently applied in each module directory.
    state: Mutex<BTreeMap<PathBuf, String>>,
    /// `(case, bucket)` pairs removed by destroy, in order.
    destroyed: Mutex<Vec<(String, String)>>,
    /// Pause between writing state and returning from apply.
    apply_delay: Duration,
}

impl StatefulTool {
    /// Creates a tool whose applies linger for `delay` after writing state.
    pub fn with_apply_delay(delay: Duration) -> Self {
        Self {
            apply_delay: delay,
            ..Self::default()
        }
    }

    /// Returns every `(case, bucket)` destroyed so far.
    pub fn destroyed(&self) -> Vec<(String, String)> {
        self.destroyed.lock().unwrap().clone()
    }

    /// Returns true when no module directory holds state.
    pub fn is_clean(&self) -> bool {
        self.state.lock().unwrap().is_empty()
    }
}

impl ProvisioningTool for StatefulTool {
    fn run(&self, step: ToolStep, ctx: &TestContext) -> Result<ToolOutput, ToolError> {
        let dir = ctx.module().path().to_path_buf();
        let mut stdout = String::new();
        match step {
            ToolStep::Apply => {
                let bucket = ctx.var_str("bucket_name").unwrap_or_default().to_string();
                self.state.lock().unwrap().insert(dir, bucket);
                thread::sleep(self.apply_delay);
            }
            ToolStep::Output => {
                stdout = match self.state.lock().unwrap().get(&dir) {
                    Some(bucket) => outputs_json(&[("bucket_name", bucket.as_str())]),
                    None => "{}".to_string(),
                };
            }
            ToolStep::Destroy => {
                if let Some(bucket) = self.state.lock().unwrap().remove(&dir) {
                    self.destroyed.lock().unwrap().push((ctx.case_name().to_string(), bucket));
                }
            }
            _ => {}
        }
        Ok(ToolOutput {
            stdout,
            stderr: String::new(),
        })
    }
}

// ============================================================================
// SECTION: Recording Sink
// ============================================================================

/// Event sink that keeps every event.
#[derive(Default)]
pub struct RecordingSink {
    /// Recorded events.
    events: Mutex<Vec<HarnessEvent>>,
}

impl RecordingSink {
    /// Returns the labels of recorded events.
    pub fn labels(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|event| event.event).collect()
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &HarnessEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Static Verifier
// ============================================================================

/// Verifier backed by a fixed set of existing resources.
#[derive(Default)]
pub struct StaticVerifier {
    /// Resources that exist.
    existing: Mutex<BTreeSet<String>>,
    /// Every resource asked about.
    asked: Mutex<Vec<ResourceId>>,
    /// Whether every lookup succeeds.
    accept_all: bool,
}

impl StaticVerifier {
    /// Verifier that reports every resource as present.
    pub fn accepting() -> Self {
        Self {
            accept_all: true,
            ..Self::default()
        }
    }

    /// Marks `name` as existing.
    pub fn insert(&self, name: &str) {
        self.existing.lock().unwrap().insert(name.to_string());
    }

    /// Returns every resource asked about.
    pub fn asked(&self) -> Vec<ResourceId> {
        self.asked.lock().unwrap().clone()
    }
}

impl ResourceVerifier for StaticVerifier {
    fn verify_exists(&self, resource: &ResourceId) -> Result<(), VerifyError> {
        self.asked.lock().unwrap().push(resource.clone());
        if self.accept_all || self.existing.lock().unwrap().contains(&resource.name) {
            Ok(())
        } else {
            Err(VerifyError::NotFound(resource.clone()))
        }
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Creates an empty module directory.
pub fn module_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Renders `terraform output -json` for string outputs.
pub fn outputs_json(entries: &[(&str, &str)]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|(name, value)| {
            (
                (*name).to_string(),
                serde_json::json!({ "value": value, "type": "string", "sensitive": false }),
            )
        })
        .collect();
    serde_json::Value::Object(map).to_string()
}
