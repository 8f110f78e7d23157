// system-tests/src/settings/tests.rs
// ============================================================================
// Module: Suite Settings Tests
// Description: Parsing of suite settings from a variable lookup.
// Purpose: Keep malformed settings failing closed.
// Dependencies: std
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::SuiteEnv;
use super::SuiteSettings;

fn settings(pairs: &[(SuiteEnv, &str)]) -> Result<SuiteSettings, String> {
    let vars: BTreeMap<&str, String> = pairs.iter().map(|(var, value)| (var.as_str(), (*value).to_string())).collect();
    SuiteSettings::from_lookup(|name| Ok(vars.get(name).cloned()))
}

#[test]
fn nothing_set_means_defaults() {
    assert_eq!(settings(&[]).unwrap(), SuiteSettings::default());
}

#[test]
fn every_variable_maps_onto_its_field() {
    let parsed = settings(&[
        (SuiteEnv::RunRoot, "target/runs"),
        (SuiteEnv::ModulesDir, "/srv/modules"),
        (SuiteEnv::TimeoutSec, "900"),
        (SuiteEnv::AllowOverwrite, "TRUE"),
    ])
    .unwrap();
    assert_eq!(parsed.run_root, Some(PathBuf::from("target/runs")));
    assert_eq!(parsed.modules_dir, Some(PathBuf::from("/srv/modules")));
    assert_eq!(parsed.timeout, Some(Duration::from_secs(900)));
    assert!(parsed.allow_overwrite);
}

#[test]
fn malformed_timeouts_and_flags_are_rejected() {
    for raw in ["0", "soon", "-5"] {
        let err = settings(&[(SuiteEnv::TimeoutSec, raw)]).unwrap_err();
        assert!(err.starts_with(SuiteEnv::TimeoutSec.as_str()), "{err}");
    }
    assert!(!settings(&[(SuiteEnv::AllowOverwrite, "0")]).unwrap().allow_overwrite);
    assert!(settings(&[(SuiteEnv::AllowOverwrite, "yes")]).is_err());
}

#[test]
fn lookup_errors_propagate() {
    let err = SuiteSettings::from_lookup(|name| Err(format!("{name} must not be empty"))).unwrap_err();
    assert!(err.contains("must not be empty"));
}

#[test]
fn variable_names_share_one_prefix() {
    assert!(SuiteEnv::ALL.iter().all(|var| var.as_str().starts_with("INFRA_PROBE_SYSTEM_TEST_")));
}
