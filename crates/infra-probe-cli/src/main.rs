// crates/infra-probe-cli/src/main.rs
// ============================================================================
// Module: Infra Probe CLI Entry Point
// Description: Command dispatcher for case runs, diagrams, and config checks.
// Purpose: Drive the provisioning test harness from the command line.
// Dependencies: clap, infra-probe-config, infra-probe-core, infra-probe-diagram, thiserror, tokio
// ============================================================================

//! ## Overview
//! `infra-probe run` loads TOML case files, runs them against Terraform with
//! bounded parallelism, and writes per-case reports plus a suite summary.
//! `infra-probe diagram` renders Mermaid diagrams from Terraform JSON.
//! `infra-probe config validate` checks a config file and `infra-probe name`
//! mints a unique resource name for manual runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use infra_probe_config::ProbeConfig;
use infra_probe_core::CaseFile;
use infra_probe_core::CaseOutcome;
use infra_probe_core::CaseReport;
use infra_probe_core::NamingConfig;
use infra_probe_core::ReportWriter;
use infra_probe_core::TestCase;
use infra_probe_core::UniqueName;
use infra_probe_core::run_suite;
use infra_probe_core::validate_bucket_name;
use infra_probe_diagram::DiagramSelection;
use infra_probe_diagram::OutputFormat;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "infra-probe", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run test cases declared in TOML case files.
    Run(RunCommand),
    /// Generate Mermaid diagrams from Terraform state or plan JSON.
    Diagram(DiagramCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print a unique resource name.
    Name(NameCommand),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Config file (defaults to `INFRA_PROBE_CONFIG`, then `infra-probe.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the configured suite parallelism.
    #[arg(long, value_name = "N")]
    max_parallel: Option<usize>,
    /// Override the artifact root directory.
    #[arg(long, value_name = "DIR")]
    artifacts: Option<PathBuf>,
    /// Case files to run.
    #[arg(value_name = "CASE_FILE", required = true)]
    case_files: Vec<PathBuf>,
}

/// Arguments for `diagram`.
#[derive(Args, Debug)]
struct DiagramCommand {
    /// Terraform state, `show -json`, or plan JSON file.
    #[arg(value_name = "STATE_FILE")]
    state_file: PathBuf,
    /// Output file; diagram files are named `<stem>-<type><ext>` beside it.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Diagram type to generate.
    #[arg(short = 't', long = "type", value_enum, default_value_t = DiagramTypeArg::Architecture)]
    diagram_type: DiagramTypeArg,
    /// Output format.
    #[arg(long, value_enum, default_value_t = FormatArg::Mermaid)]
    format: FormatArg,
}

/// Diagram type argument.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum DiagramTypeArg {
    /// Resources grouped by category.
    Architecture,
    /// Network topology.
    Network,
    /// Request data flow.
    Dataflow,
    /// All diagrams.
    All,
}

impl From<DiagramTypeArg> for DiagramSelection {
    fn from(value: DiagramTypeArg) -> Self {
        match value {
            DiagramTypeArg::Architecture => Self::Architecture,
            DiagramTypeArg::Network => Self::Network,
            DiagramTypeArg::Dataflow => Self::Dataflow,
            DiagramTypeArg::All => Self::All,
        }
    }
}

/// Diagram output format argument.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum FormatArg {
    /// Raw Mermaid source.
    Mermaid,
    /// Fenced Markdown.
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Mermaid => Self::Mermaid,
            FormatArg::Markdown => Self::Markdown,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an infra-probe configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file (defaults to `INFRA_PROBE_CONFIG`, then `infra-probe.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `name`.
#[derive(Args, Debug)]
struct NameCommand {
    /// Name prefix.
    #[arg(value_name = "PREFIX")]
    prefix: String,
    /// Check the result against bucket naming rules.
    #[arg(long)]
    bucket: bool,
    /// Random suffix length.
    #[arg(long, value_name = "N")]
    suffix_length: Option<usize>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(command).await,
        Commands::Diagram(command) => command_diagram(&command),
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Name(command) => command_name(&command),
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let config = ProbeConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let defaults = config.case_defaults().map_err(|err| CliError::new(err.to_string()))?;
    let mut cases: Vec<TestCase> = Vec::new();
    for path in &command.case_files {
        let loaded = CaseFile::load_cases(path, &defaults)
            .map_err(|err| CliError::new(format!("{}: {err}", path.display())))?;
        cases.extend(loaded);
    }
    ensure_unique_case_names(&cases)?;

    let config = with_max_parallel(config, command.max_parallel)?;
    let max_parallel = config.suite.max_parallel;
    let root = run_root(command.artifacts.as_deref().unwrap_or(config.artifacts.root.as_path()), unix_seconds());
    let writer = ReportWriter::create(&root)
        .map_err(|err| CliError::new(format!("failed to create {}: {err}", root.display())))?;
    // The GCP verifier owns a blocking HTTP client, which must be built off the runtime threads.
    let harness = tokio::task::spawn_blocking(move || config.build_harness())
        .await
        .map_err(|err| CliError::new(format!("failed to build harness: {err}")))?
        .map_err(|err| CliError::new(err.to_string()))?;

    write_stderr_line(&format!("running {} case(s), at most {max_parallel} at a time", cases.len()))
        .map_err(|err| output_error("stderr", &err))?;
    let results = run_suite(Arc::new(harness), cases, max_parallel).await;
    let summary = writer
        .write_suite(&results)
        .map_err(|err| CliError::new(format!("failed to write reports: {err}")))?;

    for report in &summary.cases {
        write_stdout_line(&outcome_line(report)).map_err(|err| output_error("stdout", &err))?;
    }
    write_stdout_line(&format!(
        "{} passed, {} expected failures, {} failed, {} leaked",
        summary.passed,
        summary.expected_failures,
        summary.failed,
        summary.leaked.len()
    ))
    .map_err(|err| output_error("stdout", &err))?;
    write_stdout_line(&format!("reports: {}", writer.root().display()))
        .map_err(|err| output_error("stdout", &err))?;

    Ok(if summary.all_succeeded() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Applies `--max-parallel`, holding it to the same bounds as the config file.
fn with_max_parallel(mut config: ProbeConfig, max_parallel: Option<usize>) -> CliResult<ProbeConfig> {
    if let Some(max_parallel) = max_parallel {
        config.suite.max_parallel = max_parallel;
        config.validate().map_err(|err| CliError::new(format!("--max-parallel: {err}")))?;
    }
    Ok(config)
}

/// Rejects case sets where two files declare the same case name.
fn ensure_unique_case_names(cases: &[TestCase]) -> CliResult<()> {
    let mut seen = std::collections::BTreeSet::new();
    for case in cases {
        if !seen.insert(case.name.as_str()) {
            return Err(CliError::new(format!("case `{}` is declared more than once", case.name)));
        }
    }
    Ok(())
}

/// Formats one line of the run summary.
fn outcome_line(report: &CaseReport) -> String {
    let mut line = match report.outcome {
        CaseOutcome::Passed => format!("PASS  {}", report.case),
        CaseOutcome::ExpectedFailure => format!(
            "XFAIL {} (matched `{}`)",
            report.case,
            report.matched_error.as_deref().unwrap_or_default()
        ),
        CaseOutcome::Failed => {
            format!("FAIL  {}: {}", report.case, report.error.as_deref().unwrap_or("unknown failure"))
        }
    };
    if let Some(teardown) = &report.teardown_error {
        line.push_str(&format!(" [teardown failed: {teardown}]"));
    }
    line
}

/// Directory for one run's artifacts.
fn run_root(base: &Path, stamp: u64) -> PathBuf {
    base.join(format!("run_{stamp}"))
}

/// Seconds since the Unix epoch, zero if the clock is before it.
fn unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or_default()
}

// ============================================================================
// SECTION: Diagram Command
// ============================================================================

/// Executes the `diagram` command.
fn command_diagram(command: &DiagramCommand) -> CliResult<ExitCode> {
    if !command.state_file.exists() {
        return Err(CliError::new(format!("state file not found: {}", command.state_file.display())));
    }
    write_stdout_line(&format!("Parsing Terraform state: {}", command.state_file.display()))
        .map_err(|err| output_error("stdout", &err))?;
    let inventory = infra_probe_diagram::parse_file(&command.state_file).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&format!("Found {} resources", inventory.len())).map_err(|err| output_error("stdout", &err))?;
    if inventory.is_empty() {
        write_stderr_line(
            "warning: no managed resources found; the plan may be empty or the document shape unrecognised. \
             Rendering placeholder diagrams.",
        )
        .map_err(|err| output_error("stderr", &err))?;
    }

    let diagrams = infra_probe_diagram::render_all(
        &inventory,
        command.diagram_type.into(),
        command.format.into(),
        command.output.as_deref(),
    );
    infra_probe_diagram::write_all(&diagrams).map_err(|err| CliError::new(err.to_string()))?;
    for diagram in &diagrams {
        write_stdout_line(&format!("Generated {} diagram: {}", diagram.kind, diagram.path.display()))
            .map_err(|err| output_error("stdout", &err))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = ProbeConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line(&format!(
        "config ok: terraform={} project={} max_parallel={}",
        config.terraform.binary.display(),
        config.gcp.project_id.as_deref().unwrap_or("<unset>"),
        config.suite.max_parallel
    ))
    .map_err(|err| output_error("stdout", &err))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Name Command
// ============================================================================

/// Executes the `name` command.
fn command_name(command: &NameCommand) -> CliResult<ExitCode> {
    let name = mint_name(command)?;
    write_stdout_line(&name).map_err(|err| output_error("stdout", &err))?;
    Ok(ExitCode::SUCCESS)
}

/// Generates a name for the `name` command, validating bucket rules on request.
fn mint_name(command: &NameCommand) -> CliResult<String> {
    let mut naming = NamingConfig::default();
    if let Some(length) = command.suffix_length {
        naming.suffix_length = length;
    }
    naming.validate().map_err(|err| CliError::new(err.to_string()))?;
    let name = UniqueName::generate(&command.prefix, &naming).into_string();
    if command.bucket {
        validate_bucket_name(&name).map_err(|err| CliError::new(err.to_string()))?;
    }
    Ok(name)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write {stream}: {error}"))
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
