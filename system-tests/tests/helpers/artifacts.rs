// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Case Artifacts
// Description: Per-test artifact directories and case summaries.
// Purpose: Leave a readable record of every system-test case, even on panic.
// Dependencies: system-tests, infra-probe-core, serde, serde_jcs
// ============================================================================

//! ## Overview
//! Each test gets `<run root>/<test name>/` holding `summary.json` (canonical
//! JSON) and `summary.md`. Without a configured run root, runs land under
//! `target/system-tests/run_<millis>/`.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use infra_probe_core::CaseReport;
use infra_probe_core::CaseResult;
use serde::Serialize;
use system_tests::settings::SuiteSettings;

/// Directory receiving one test's artifacts.
#[derive(Debug, Clone)]
pub struct CaseArtifacts {
    /// Artifact directory.
    dir: PathBuf,
}

impl CaseArtifacts {
    /// Creates the artifact directory for `test_name`.
    ///
    /// A non-empty directory is only reused when the settings allow it.
    pub fn create(test_name: &str, settings: &SuiteSettings) -> io::Result<Self> {
        let base = settings.run_root.clone().unwrap_or_else(|| {
            let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
            PathBuf::from("target/system-tests").join(format!("run_{millis}"))
        });
        let dir = base.join(test_name);
        let occupied = fs::read_dir(&dir).is_ok_and(|mut entries| entries.next().is_some());
        if occupied && !settings.allow_overwrite {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already holds artifacts", dir.display()),
            ));
        }
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
        })
    }

    /// Writes `value` as canonical JSON.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let path = self.dir.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes UTF-8 text.
    pub fn write_text(&self, name: &str, text: &str) -> io::Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, text)?;
        Ok(path)
    }
}

/// Summary written for every test.
#[derive(Debug, Serialize)]
struct CaseSummary<'a> {
    /// Test function name.
    test_name: &'a str,
    /// `pass`, `fail`, `panic` or `unknown`.
    status: &'a str,
    /// Wall-clock time of the whole test.
    duration_ms: u64,
    /// Failure messages and other remarks.
    notes: Vec<String>,
    /// Harness report, when the case got that far.
    report: Option<&'a CaseReport>,
}

/// Records a test's case result, writing a fallback summary if dropped first.
pub struct CaseRecorder {
    /// Destination directory.
    artifacts: CaseArtifacts,
    /// Test function name.
    test_name: String,
    /// Test start.
    started: Instant,
    /// Whether a summary has been written.
    recorded: bool,
}

impl CaseRecorder {
    /// Starts recording `test_name`.
    pub fn start(test_name: &str, settings: &SuiteSettings) -> io::Result<Self> {
        Ok(Self {
            artifacts: CaseArtifacts::create(test_name, settings)?,
            test_name: test_name.to_string(),
            started: Instant::now(),
            recorded: false,
        })
    }

    /// Writes the summary for a finished case.
    pub fn record(&mut self, result: &CaseResult) -> io::Result<()> {
        match result {
            Ok(report) => self.write("pass", Vec::new(), Some(report)),
            Err(failure) => self.write("fail", vec![failure.to_string()], Some(&failure.report)),
        }
    }

    /// Writes `summary.json` and `summary.md`.
    fn write(&mut self, status: &str, notes: Vec<String>, report: Option<&CaseReport>) -> io::Result<()> {
        let summary = CaseSummary {
            test_name: &self.test_name,
            status,
            duration_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            notes,
            report,
        };
        self.artifacts.write_json("summary.json", &summary)?;
        self.artifacts.write_text("summary.md", &summary_markdown(&summary))?;
        self.recorded = true;
        Ok(())
    }
}

impl Drop for CaseRecorder {
    fn drop(&mut self) {
        if self.recorded {
            return;
        }
        let status = if std::thread::panicking() { "panic" } else { "unknown" };
        let _ = self.write(status, vec!["test ended before its case was recorded".to_string()], None);
    }
}

/// Renders the Markdown summary.
fn summary_markdown(summary: &CaseSummary<'_>) -> String {
    let mut out = String::from("# System-Test Summary\n\n## Status\n\n");
    let _ = writeln!(out, "- Test: {}", summary.test_name);
    let _ = writeln!(out, "- Status: {}", summary.status);
    let _ = writeln!(out, "- Duration (ms): {}", summary.duration_ms);
    if let Some(report) = summary.report {
        let _ = writeln!(out, "- Module: {}", report.module);
        out.push_str("\n## Generated Names\n\n");
        push_pairs(&mut out, report.unique_names.iter());
        out.push_str("\n## Outputs\n\n");
        push_pairs(&mut out, report.outputs.iter());
    }
    out.push_str("\n## Notes\n\n");
    if summary.notes.is_empty() {
        out.push_str("- None\n");
    }
    for note in &summary.notes {
        let _ = writeln!(out, "- {note}");
    }
    out
}

/// Appends `- key: value` lines, or `- None`.
fn push_pairs<'a>(out: &mut String, pairs: impl ExactSizeIterator<Item = (&'a String, &'a String)>) {
    if pairs.len() == 0 {
        out.push_str("- None\n");
    }
    for (key, value) in pairs {
        let _ = writeln!(out, "- {key}: `{value}`");
    }
}
