// crates/infra-probe-core/src/report.rs
// ============================================================================
// Module: Run Reports
// Description: Per-case and suite summary artifacts.
// Purpose: Persist deterministic JSON and Markdown summaries of a run.
// Dependencies: serde, serde_jcs, crate::{harness, suite}
// ============================================================================

//! ## Overview
//! A [`ReportWriter`] owns one run directory. It writes each case report as
//! canonical JSON and a suite summary as `summary.json` and `summary.md`.
//! Leaked resources (cases whose teardown failed) are listed explicitly so
//! they can be cleaned up by hand.
//!
//! Case names are mapped onto safe file stems. When two names map onto the
//! same stem, later ones get a `-2`, `-3`, ... suffix so no report is
//! overwritten.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::harness::CaseOutcome;
use crate::harness::CaseReport;
use crate::suite::CaseResult;

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Aggregate view of a suite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    /// Number of cases run.
    pub total: usize,
    /// Cases that passed.
    pub passed: usize,
    /// Negative cases that failed as expected.
    pub expected_failures: usize,
    /// Cases that failed.
    pub failed: usize,
    /// Case names whose teardown failed.
    pub leaked: Vec<String>,
    /// Per-case reports in run order.
    pub cases: Vec<CaseReport>,
}

impl SuiteSummary {
    /// Summarises suite results.
    #[must_use]
    pub fn from_results(results: &[CaseResult]) -> Self {
        let cases: Vec<CaseReport> = results
            .iter()
            .map(|result| match result {
                Ok(report) => report.clone(),
                Err(failure) => failure.report.clone(),
            })
            .collect();
        let count = |outcome: CaseOutcome| cases.iter().filter(|case| case.outcome == outcome).count();
        Self {
            total: cases.len(),
            passed: count(CaseOutcome::Passed),
            expected_failures: count(CaseOutcome::ExpectedFailure),
            failed: count(CaseOutcome::Failed),
            leaked: cases
                .iter()
                .filter(|case| case.teardown_error.is_some())
                .map(|case| case.case.clone())
                .collect(),
            cases,
        }
    }

    /// Returns true when no case failed.
    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Renders the summary as Markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Infra Probe Summary\n\n");
        out.push_str("## Totals\n\n");
        let _ = writeln!(out, "- Cases: {}", self.total);
        let _ = writeln!(out, "- Passed: {}", self.passed);
        let _ = writeln!(out, "- Expected failures: {}", self.expected_failures);
        let _ = writeln!(out, "- Failed: {}", self.failed);
        out.push_str("\n## Cases\n\n");
        if self.cases.is_empty() {
            out.push_str("- None\n");
        }
        for case in &self.cases {
            let _ = write!(out, "- {}: {} ({} ms)", case.case, outcome_label(case.outcome), case.duration_ms);
            if let Some(error) = &case.error {
                let _ = write!(out, " - {error}");
            }
            out.push('\n');
        }
        out.push_str("\n## Leaked Resources\n\n");
        if self.leaked.is_empty() {
            out.push_str("- None\n");
        }
        for case in &self.cases {
            if let Some(error) = &case.teardown_error {
                let names: Vec<&str> = case.unique_names.values().map(String::as_str).collect();
                let _ = writeln!(out, "- {} [{}]: {error}", case.case, names.join(", "));
            }
        }
        out
    }
}

/// Stable label for an outcome.
const fn outcome_label(outcome: CaseOutcome) -> &'static str {
    match outcome {
        CaseOutcome::Passed => "passed",
        CaseOutcome::ExpectedFailure => "expected failure",
        CaseOutcome::Failed => "FAILED",
    }
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Writes report artifacts under one run directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    /// Run directory.
    root: PathBuf,
}

impl ReportWriter {
    /// Creates the run directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("cases"))?;
        Ok(Self {
            root,
        })
    }

    /// Returns the run directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the write fails.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes a UTF-8 text artifact.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn write_text(&self, name: &str, value: &str) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes())?;
        Ok(path)
    }

    /// Writes one case report to `cases/<case>.json`.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the write fails.
    pub fn write_case(&self, report: &CaseReport) -> io::Result<PathBuf> {
        self.write_case_as(&file_stem(&report.case), report)
    }

    /// Writes one case report to `cases/<stem>.json`.
    fn write_case_as(&self, stem: &str, report: &CaseReport) -> io::Result<PathBuf> {
        self.write_json(&format!("cases/{stem}.json"), report)
    }

    /// Writes every case report plus `summary.json` and `summary.md`.
    ///
    /// # Errors
    ///
    /// Returns an error when any artifact cannot be written.
    pub fn write_suite(&self, results: &[CaseResult]) -> io::Result<SuiteSummary> {
        let summary = SuiteSummary::from_results(results);
        let mut taken = BTreeSet::new();
        for case in &summary.cases {
            let stem = unique_stem(&case.case, &mut taken);
            self.write_case_as(&stem, case)?;
        }
        self.write_json("summary.json", &summary)?;
        self.write_text("summary.md", &summary.to_markdown())?;
        Ok(summary)
    }
}

/// Maps a case name onto a safe file stem.
fn file_stem(case: &str) -> String {
    let stem: String = case
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if stem.is_empty() { "case".to_string() } else { stem }
}

/// Returns a stem for `case` that is not yet in `taken`, and reserves it.
fn unique_stem(case: &str, taken: &mut BTreeSet<String>) -> String {
    let base = file_stem(case);
    let mut stem = base.clone();
    let mut counter = 2u32;
    while taken.contains(&stem) {
        stem = format!("{base}-{counter}");
        counter = counter.saturating_add(1);
    }
    taken.insert(stem.clone());
    stem
}
