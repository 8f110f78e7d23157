// crates/infra-probe-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Tests
// Description: Argument parsing and command helper tests.
// Purpose: Keep the command surface and summary formatting stable.
// Dependencies: clap, infra-probe-core, tempfile
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use infra_probe_config::ProbeConfig;
use infra_probe_core::CaseOutcome;
use infra_probe_core::CasePhase;
use infra_probe_core::CaseReport;
use infra_probe_core::TestCase;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::DiagramCommand;
use super::DiagramTypeArg;
use super::FormatArg;
use super::NameCommand;
use super::command_diagram;
use super::ensure_unique_case_names;
use super::mint_name;
use super::outcome_line;
use super::run_root;
use super::with_max_parallel;

fn report(outcome: CaseOutcome) -> CaseReport {
    CaseReport {
        case: "bucket".to_string(),
        module: "modules/gcs-bucket".to_string(),
        outcome,
        phases: vec![CasePhase::Prepared],
        unique_names: BTreeMap::new(),
        outputs: BTreeMap::new(),
        matched_error: None,
        error: None,
        teardown_error: None,
        duration_ms: 0,
    }
}

#[test]
fn run_requires_case_files() {
    assert!(Cli::try_parse_from(["infra-probe", "run"]).is_err());

    let cli = Cli::try_parse_from(["infra-probe", "run", "--max-parallel", "2", "a.toml", "b.toml"]).unwrap();
    let Commands::Run(command) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(command.max_parallel, Some(2));
    assert_eq!(command.case_files, vec![PathBuf::from("a.toml"), PathBuf::from("b.toml")]);
}

#[test]
fn diagram_arguments_default_to_architecture_mermaid() {
    let cli = Cli::try_parse_from(["infra-probe", "diagram", "tfplan.json"]).unwrap();
    let Commands::Diagram(command) = cli.command else {
        panic!("expected diagram command");
    };
    assert_eq!(command.diagram_type, DiagramTypeArg::Architecture);
    assert_eq!(command.format, FormatArg::Mermaid);

    let cli =
        Cli::try_parse_from(["infra-probe", "diagram", "s.json", "-t", "all", "--format", "markdown", "-o", "d.md"])
            .unwrap();
    let Commands::Diagram(command) = cli.command else {
        panic!("expected diagram command");
    };
    assert_eq!(command.diagram_type, DiagramTypeArg::All);
    assert_eq!(command.format, FormatArg::Markdown);
    assert!(Cli::try_parse_from(["infra-probe", "diagram", "s.json", "-t", "sequence"]).is_err());
}

#[test]
fn config_validate_accepts_a_path() {
    let cli = Cli::try_parse_from(["infra-probe", "config", "validate", "--config", "probe.toml"]).unwrap();
    let Commands::Config {
        command: ConfigCommand::Validate(command),
    } = cli.command
    else {
        panic!("expected config validate");
    };
    assert_eq!(command.config.as_deref(), Some(Path::new("probe.toml")));
}

#[test]
fn outcome_lines_describe_each_verdict() {
    assert_eq!(outcome_line(&report(CaseOutcome::Passed)), "PASS  bucket");

    let mut expected = report(CaseOutcome::ExpectedFailure);
    expected.matched_error = Some("*Invalid bucket name*".to_string());
    assert_eq!(outcome_line(&expected), "XFAIL bucket (matched `*Invalid bucket name*`)");

    let mut failed = report(CaseOutcome::Failed);
    failed.error = Some("apply failed".to_string());
    failed.teardown_error = Some("destroy failed".to_string());
    assert_eq!(outcome_line(&failed), "FAIL  bucket: apply failed [teardown failed: destroy failed]");
}

#[test]
fn run_roots_are_stamped() {
    assert_eq!(run_root(Path::new("target/infra-probe"), 42), PathBuf::from("target/infra-probe/run_42"));
}

#[test]
fn duplicate_case_names_across_files_are_rejected() {
    let cases = vec![
        TestCase::builder("bucket", "modules/a").build().unwrap(),
        TestCase::builder("bucket", "modules/b").build().unwrap(),
    ];
    let err = ensure_unique_case_names(&cases).unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn minted_names_respect_suffix_length_and_bucket_rules() {
    let name = mint_name(&NameCommand {
        prefix: "test-bucket".to_string(),
        bucket: true,
        suffix_length: Some(8),
    })
    .unwrap();
    assert!(name.starts_with("test-bucket-"));
    assert_eq!(name.len(), "test-bucket-".len() + 8);

    let err = mint_name(&NameCommand {
        prefix: "Invalid_Bucket".to_string(),
        bucket: true,
        suffix_length: None,
    })
    .unwrap_err();
    assert!(err.to_string().contains("invalid bucket name"));

    assert!(
        mint_name(&NameCommand {
            prefix: "x".to_string(),
            bucket: false,
            suffix_length: Some(1),
        })
        .is_err()
    );
}

#[test]
fn diagram_command_writes_requested_files() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    std::fs::write(
        &state,
        r#"{"values": {"root_module": {"resources": [
            {"address": "google_storage_bucket.bucket", "mode": "managed",
             "type": "google_storage_bucket", "name": "bucket", "values": {"name": "b"}}
        ]}}}"#,
    )
    .unwrap();

    command_diagram(&DiagramCommand {
        state_file: state,
        output: Some(dir.path().join("infra.mmd")),
        diagram_type: DiagramTypeArg::Architecture,
        format: FormatArg::Mermaid,
    })
    .unwrap();

    let written = std::fs::read_to_string(dir.path().join("infra-architecture.mmd")).unwrap();
    assert!(written.contains("google_storage_bucket_bucket[📦 Bucket<br/>b]"));

    let missing = command_diagram(&DiagramCommand {
        state_file: dir.path().join("absent.json"),
        output: None,
        diagram_type: DiagramTypeArg::Network,
        format: FormatArg::Mermaid,
    });
    assert!(missing.unwrap_err().to_string().contains("state file not found"));
}

#[test]
fn max_parallel_override_is_held_to_config_bounds() {
    let config = ProbeConfig::from_toml_str("").unwrap();
    assert_eq!(with_max_parallel(config.clone(), None).unwrap().suite.max_parallel, 4);
    assert_eq!(with_max_parallel(config.clone(), Some(16)).unwrap().suite.max_parallel, 16);

    for rejected in [0, 65] {
        let err = with_max_parallel(config.clone(), Some(rejected)).unwrap_err();
        assert!(err.to_string().contains("suite.max_parallel"));
    }
}
