// crates/infra-probe-core/src/events.rs
// ============================================================================
// Module: Harness Events
// Description: Structured JSON-line events for case execution.
// Purpose: Emit lifecycle logs without binding to a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every phase transition, tool step, retry, and teardown failure is recorded
//! as a [`HarnessEvent`]. Sinks route events to stderr, an append-only file, or
//! nowhere, so callers can pick their own log pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::harness::CasePhase;
use crate::tool::ToolStep;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Harness event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Case the event belongs to.
    pub case: String,
    /// Phase entered, for phase events.
    pub phase: Option<CasePhase>,
    /// Tool step, for step and retry events.
    pub step: Option<ToolStep>,
    /// Retry number, for retry events.
    pub attempt: Option<u32>,
    /// Step duration in milliseconds, for finished steps.
    pub duration_ms: Option<u128>,
    /// Free-form detail.
    pub message: Option<String>,
}

impl HarnessEvent {
    /// Creates a bare event with a consistent timestamp.
    fn new(event: &'static str, case: &str) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            case: case.to_string(),
            phase: None,
            step: None,
            attempt: None,
            duration_ms: None,
            message: None,
        }
    }

    /// Case entered `phase`.
    #[must_use]
    pub fn phase(case: &str, phase: CasePhase, message: Option<String>) -> Self {
        Self {
            phase: Some(phase),
            message,
            ..Self::new("case_phase", case)
        }
    }

    /// Tool step started.
    #[must_use]
    pub fn step_started(case: &str, step: ToolStep) -> Self {
        Self {
            step: Some(step),
            ..Self::new("step_started", case)
        }
    }

    /// Tool step completed successfully.
    #[must_use]
    pub fn step_finished(case: &str, step: ToolStep, elapsed: Duration) -> Self {
        Self {
            step: Some(step),
            duration_ms: Some(elapsed.as_millis()),
            ..Self::new("step_finished", case)
        }
    }

    /// Tool step failed (after any retries).
    #[must_use]
    pub fn step_failed(case: &str, step: ToolStep, message: String) -> Self {
        Self {
            step: Some(step),
            message: Some(message),
            ..Self::new("step_failed", case)
        }
    }

    /// Transient failure is being retried.
    #[must_use]
    pub fn retry(case: &str, step: ToolStep, attempt: u32, reason: &str) -> Self {
        Self {
            step: Some(step),
            attempt: Some(attempt),
            message: Some(reason.to_string()),
            ..Self::new("step_retry", case)
        }
    }

    /// Teardown failed; resources may have leaked.
    #[must_use]
    pub fn teardown_failed(case: &str, message: String) -> Self {
        Self {
            step: Some(ToolStep::Destroy),
            message: Some(message),
            ..Self::new("teardown_failed", case)
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for harness events.
pub trait EventSink: Send + Sync {
    /// Records an event. Sinks must not panic.
    fn record(&self, event: &HarnessEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}
