// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Harness Fixture
// Description: Builds the Terraform harness the suites share.
// Purpose: Resolve config, project, and module paths once per test.
// Dependencies: system-tests, infra-probe-config, infra-probe-core
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use infra_probe_config::ProbeConfig;
use infra_probe_core::AppliedCase;
use infra_probe_core::CaseReport;
use infra_probe_core::Harness;
use infra_probe_core::RetryPolicy;
use infra_probe_core::TerraformCli;
use infra_probe_core::TestCase;
use system_tests::settings::SuiteSettings;

use super::artifacts::CaseRecorder;

/// Harness plus the settings every suite needs.
pub struct Fixture {
    /// Terraform-backed harness with the GCP verifier attached.
    pub harness: Harness<TerraformCli>,
    /// Project the cases provision into.
    pub project_id: String,
    /// Retry policy from configuration.
    pub retry: RetryPolicy,
    /// Suite settings.
    settings: SuiteSettings,
}

impl Fixture {
    /// Loads configuration and builds the harness.
    ///
    /// The project id is required; there is nothing to provision into
    /// without one.
    pub fn load() -> Result<Self, String> {
        let settings = SuiteSettings::from_env()?;
        let mut config = ProbeConfig::load(None).map_err(|err| err.to_string())?;
        if let Some(timeout) = settings.timeout {
            config.terraform.timeout_secs = timeout.as_secs();
        }
        let project_id = config
            .gcp
            .project_id
            .clone()
            .ok_or_else(|| "system tests need gcp.project_id or INFRA_PROBE_PROJECT_ID".to_string())?;
        let retry = config.retry_policy().map_err(|err| err.to_string())?;
        let harness = config.build_harness().map_err(|err| err.to_string())?;
        Ok(Self {
            harness,
            project_id,
            retry,
            settings,
        })
    }

    /// Returns the directory of the named fixture module.
    pub fn module(&self, name: &str) -> PathBuf {
        self.settings
            .modules_dir
            .clone()
            .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("modules"))
            .join(name)
    }

    /// Runs `case` with a custom check and records the outcome as artifacts.
    pub fn run_recorded<F>(&self, test_name: &str, case: &TestCase, verify: F) -> Result<CaseReport, String>
    where
        F: FnOnce(&AppliedCase<'_>) -> Result<(), String>,
    {
        let mut recorder = CaseRecorder::start(test_name, &self.settings).map_err(|err| err.to_string())?;
        let result = self.harness.run(case, verify);
        recorder.record(&result).map_err(|err| err.to_string())?;
        result.map_err(|failure| failure.to_string())
    }
}
