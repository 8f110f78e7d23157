// crates/infra-probe-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load and Validation Tests
// Description: Parsing, fail-closed validation, and harness mapping.
// Purpose: Ensure infra-probe.toml is strict and maps onto harness types.
// Dependencies: infra-probe-config, infra-probe-core, infra-probe-gcp, tempfile
// ============================================================================

//! ## Overview
//! Exercises a full config document, each validation rule, and the builders
//! that turn a config into retry policies, tool settings, and event sinks.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;

use infra_probe_config::ConfigError;
use infra_probe_config::EventSinkKind;
use infra_probe_config::MAX_CONFIG_FILE_SIZE;
use infra_probe_config::ProbeConfig;
use infra_probe_core::CasePhase;
use infra_probe_core::HarnessEvent;
use infra_probe_core::ToolError;
use infra_probe_core::ToolOutput;
use infra_probe_core::ToolStep;
use infra_probe_gcp::TokenSource;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const FULL: &str = r#"
[terraform]
binary = "/usr/local/bin/terraform"
timeout_secs = 900

[terraform.env]
TF_LOG = "WARN"

[retry]
max_retries = 2
delay_ms = 250

[[retry.patterns]]
pattern = "(?i)error 409"
description = "Bucket name still reserved"

[[retry.patterns]]
pattern = "googleapi: Error 503"
description = "Transient backend error"

[naming]
suffix_length = 8

[gcp]
project_id = "test-project-12345"
storage_endpoint = "http://127.0.0.1:4443"
request_timeout_secs = 10
token = { source = "env", var = "GCS_TOKEN" }

[events]
sink = "none"

[artifacts]
root = "out/probe"

[suite]
max_parallel = 6
"#;

fn invalid(text: &str) -> String {
    match ProbeConfig::from_toml_str(text) {
        Err(ConfigError::Invalid(message)) => message,
        Err(other) => panic!("expected invalid config, got: {other}"),
        Ok(_) => panic!("expected invalid config for:\n{text}"),
    }
}

fn failed(stderr: &str) -> ToolError {
    ToolError::Failed {
        step: ToolStep::Apply,
        code: Some(1),
        output: ToolOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
        },
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn full_document_parses_and_maps() {
    let config = ProbeConfig::from_toml_str(FULL).unwrap();

    let settings = config.terraform_settings();
    assert_eq!(settings.binary, Path::new("/usr/local/bin/terraform"));
    assert_eq!(settings.timeout, Duration::from_secs(900));
    assert_eq!(settings.env.get("TF_LOG").map(String::as_str), Some("WARN"));

    let policy = config.retry_policy().unwrap();
    assert_eq!(policy.max_retries(), 2);
    assert_eq!(policy.delay(), Duration::from_millis(250));
    assert_eq!(policy.retry_reason(&failed("Error 409: conflict")), Some("Bucket name still reserved"));
    assert_eq!(policy.retry_reason(&failed("Error 400: bad request")), None);

    assert_eq!(config.naming.suffix_length, 8);

    let gcp = config.gcp_settings();
    assert_eq!(gcp.storage_endpoint, "http://127.0.0.1:4443");
    assert_eq!(gcp.pubsub_endpoint, "https://pubsub.googleapis.com");
    assert_eq!(gcp.request_timeout, Duration::from_secs(10));
    assert_eq!(
        gcp.token,
        TokenSource::Env {
            var: "GCS_TOKEN".to_string()
        }
    );

    assert_eq!(config.events.sink, EventSinkKind::None);
    assert_eq!(config.artifacts.root, Path::new("out/probe"));
    assert_eq!(config.suite.max_parallel, 6);
    assert_eq!(config.case_defaults().unwrap().project_id.as_deref(), Some("test-project-12345"));
}

#[test]
fn empty_document_uses_the_eventual_consistency_defaults() {
    let config = ProbeConfig::from_toml_str("").unwrap();
    let policy = config.retry_policy().unwrap();

    assert_eq!(policy.max_retries(), 3);
    assert_eq!(policy.delay(), Duration::from_secs(5));
    assert_eq!(policy.retry_reason(&failed("anything")), Some("Retrying due to eventual consistency"));
    assert_eq!(config.gcp.token, TokenSource::default());
    assert_eq!(config.events.sink, EventSinkKind::Stderr);
}

#[test]
fn unknown_keys_are_parse_errors() {
    assert!(matches!(ProbeConfig::from_toml_str("[terraform]\nbinnary = \"tf\"\n"), Err(ConfigError::Parse(_))));
    assert!(matches!(ProbeConfig::from_toml_str("[telemetry]\nenabled = true\n"), Err(ConfigError::Parse(_))));
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn out_of_range_values_are_rejected() {
    assert!(invalid("[terraform]\ntimeout_secs = 0\n").contains("terraform.timeout_secs"));
    assert!(invalid("[terraform]\nbinary = \"  \"\n").contains("terraform.binary"));
    assert!(invalid("[terraform.env]\n\"A=B\" = \"x\"\n").contains("terraform.env"));
    assert!(invalid("[retry]\nmax_retries = 99\n").contains("retry.max_retries"));
    assert!(invalid("[naming]\nsuffix_length = 2\n").contains("naming"));
    assert!(invalid("[suite]\nmax_parallel = 0\n").contains("suite.max_parallel"));
    assert!(invalid("[gcp]\nrequest_timeout_secs = 0\n").contains("gcp.request_timeout_secs"));
}

#[test]
fn retry_patterns_must_compile_and_be_described() {
    assert!(invalid("[[retry.patterns]]\npattern = \"(\"\ndescription = \"x\"\n").contains("retry.patterns"));
    assert!(invalid("[[retry.patterns]]\npattern = \"409\"\ndescription = \" \"\n").contains("description"));
}

#[test]
fn gcp_section_is_checked() {
    assert!(invalid("[gcp]\nproject_id = \"\"\n").contains("gcp.project_id"));
    assert!(invalid("[gcp]\nstorage_endpoint = \"storage.googleapis.com\"\n").contains("gcp.storage_endpoint"));
    assert!(invalid("[gcp]\ntoken = { source = \"static\", token = \"\" }\n").contains("static token"));
}

#[test]
fn event_path_must_match_the_sink() {
    assert!(invalid("[events]\nsink = \"file\"\n").contains("events.path is required"));
    assert!(invalid("[events]\nsink = \"stderr\"\npath = \"events.jsonl\"\n").contains("only valid"));
}

#[test]
fn oversized_and_non_utf8_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let big = dir.path().join("big.toml");
    std::fs::write(&big, "#".repeat(MAX_CONFIG_FILE_SIZE + 1)).unwrap();
    let err = ProbeConfig::load(Some(&big)).unwrap_err();
    assert!(err.to_string().contains("size limit"));

    let binary = dir.path().join("binary.toml");
    std::fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
    let err = ProbeConfig::load(Some(&binary)).unwrap_err();
    assert!(err.to_string().contains("utf-8"));
}

// ============================================================================
// SECTION: Event Sinks
// ============================================================================

#[test]
fn file_sink_creates_its_directory_and_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs/events.jsonl");
    let text = format!("[events]\nsink = \"file\"\npath = \"{}\"\n", path.display());
    let config = ProbeConfig::from_toml_str(&text).unwrap();

    let sink = config.event_sink().unwrap();
    sink.record(&HarnessEvent::phase("bucket", CasePhase::Prepared, None));

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\"prepared\""));
}

#[cfg(unix)]
#[test]
fn harness_is_built_from_config() {
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = tempfile::tempdir().unwrap();
    let script = bin_dir.path().join("terraform");
    std::fs::write(&script, "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    let mut config = ProbeConfig::from_toml_str(FULL).unwrap();
    config.terraform.binary = script;

    let harness = config.build_harness().unwrap();

    assert_eq!(harness.naming().suffix_length, 8);
    assert_eq!(harness.tool().settings().timeout, Duration::from_secs(900));
}

#[test]
fn missing_terraform_binary_fails_before_any_case_runs() {
    let mut config = ProbeConfig::from_toml_str(FULL).unwrap();
    config.terraform.binary = "/nonexistent/infra-probe/terraform".into();

    let Err(err) = config.build_harness() else {
        panic!("missing terraform binary must be rejected");
    };
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("terraform.binary"));
}

#[test]
fn bundled_example_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../infra-probe.example.toml");
    let content = std::fs::read_to_string(path).unwrap();
    let config = ProbeConfig::from_toml_str(&content).unwrap();
    assert_eq!(config.gcp.project_id.as_deref(), Some("my-test-project"));
    assert_eq!(config.suite.max_parallel, 4);
}
