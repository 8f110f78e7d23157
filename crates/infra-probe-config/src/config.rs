// crates/infra-probe-config/src/config.rs
// ============================================================================
// Module: Probe Configuration
// Description: TOML configuration model, loading, and validation.
// Purpose: Single source of settings for the harness, verifier, and runners.
// Dependencies: infra-probe-core, infra-probe-gcp, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! [`ProbeConfig`] is loaded from `infra-probe.toml`. `INFRA_PROBE_CONFIG`
//! overrides the location and an explicit path wins over both. When nothing
//! is named and the default file is absent, built-in defaults apply.
//! Environment overrides from [`ProbeEnv::OVERRIDES`] are applied after
//! parsing, then the whole config is validated. Unknown keys are rejected.
//!
//! The config owns no runtime state. It maps onto harness types through
//! [`ProbeConfig::retry_policy`], [`ProbeConfig::terraform_settings`],
//! [`ProbeConfig::gcp_settings`], [`ProbeConfig::event_sink`], and
//! [`ProbeConfig::build_harness`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use infra_probe_core::CaseDefaults;
use infra_probe_core::EventSink;
use infra_probe_core::FileEventSink;
use infra_probe_core::Harness;
use infra_probe_core::NamingConfig;
use infra_probe_core::NoopEventSink;
use infra_probe_core::RetryPolicy;
use infra_probe_core::RetryablePattern;
use infra_probe_core::StderrEventSink;
use infra_probe_core::TerraformCli;
use infra_probe_core::TerraformSettings;
use infra_probe_core::retry::DEFAULT_MAX_RETRIES;
use infra_probe_core::retry::EVENTUAL_CONSISTENCY_REASON;
use infra_probe_core::suite::DEFAULT_MAX_PARALLEL;
use infra_probe_core::terraform::DEFAULT_TERRAFORM_BINARY;
use infra_probe_gcp::DEFAULT_PUBSUB_ENDPOINT;
use infra_probe_gcp::DEFAULT_STORAGE_ENDPOINT;
use infra_probe_gcp::GcpSettings;
use infra_probe_gcp::GcpVerifier;
use infra_probe_gcp::TokenSource;
use serde::Deserialize;
use thiserror::Error;

use crate::env::ProbeEnv;
use crate::env::parse_timeout_seconds;
use crate::env::read_env_nonempty;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Default config file name.
pub const DEFAULT_CONFIG_NAME: &str = "infra-probe.toml";
/// Maximum size of a config file in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 256 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default per-command timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30 * 60;
/// Longest per-command timeout accepted.
const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;
/// Default delay between retries in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5_000;
/// Largest retry budget accepted.
const MAX_RETRIES: u32 = 20;
/// Longest retry delay accepted.
const MAX_RETRY_DELAY_MS: u64 = 10 * 60 * 1000;
/// Maximum number of retryable patterns.
const MAX_RETRY_PATTERNS: usize = 64;
/// Default request timeout for provider reads in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Longest request timeout accepted.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 10 * 60;
/// Largest suite parallelism accepted.
const MAX_PARALLEL: usize = 64;
/// Default artifact root.
pub const DEFAULT_ARTIFACT_ROOT: &str = "target/infra-probe";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Infra Probe configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// Terraform invocation settings.
    #[serde(default)]
    pub terraform: TerraformConfig,
    /// Retry policy for init, apply, and destroy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Unique-name generation settings.
    #[serde(default)]
    pub naming: NamingConfig,
    /// Google Cloud project and read API settings.
    #[serde(default)]
    pub gcp: GcpConfig,
    /// Harness event output.
    #[serde(default)]
    pub events: EventsConfig,
    /// Report artifact location.
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    /// Suite scheduling.
    #[serde(default)]
    pub suite: SuiteConfig,
}

/// `[terraform]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerraformConfig {
    /// Executable name or path.
    pub binary: PathBuf,
    /// Per-command timeout in seconds.
    pub timeout_secs: u64,
    /// Extra environment passed to every command.
    pub env: BTreeMap<String, String>,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_TERRAFORM_BINARY),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            env: BTreeMap::new(),
        }
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Extra attempts after the first. Zero disables retries.
    pub max_retries: u32,
    /// Fixed wait between attempts in milliseconds.
    pub delay_ms: u64,
    /// Regexes that mark a failure as transient.
    pub patterns: Vec<RetryPatternConfig>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
            patterns: vec![RetryPatternConfig {
                pattern: ".*".to_string(),
                description: EVENTUAL_CONSISTENCY_REASON.to_string(),
            }],
        }
    }
}

/// One `[[retry.patterns]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPatternConfig {
    /// Regex matched against the failure text.
    pub pattern: String,
    /// Reason reported when the pattern triggers a retry.
    pub description: String,
}

/// `[gcp]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GcpConfig {
    /// Project bound to `project_id` when a case omits it.
    pub project_id: Option<String>,
    /// Cloud Storage API base URL.
    pub storage_endpoint: String,
    /// Pub/Sub API base URL.
    pub pubsub_endpoint: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Access token source.
    pub token: TokenSource,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            storage_endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            pubsub_endpoint: DEFAULT_PUBSUB_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            token: TokenSource::default(),
        }
    }
}

/// Where harness events go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `events.path`.
    File,
    /// Discard events.
    None,
}

/// `[events]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    /// Sink kind.
    pub sink: EventSinkKind,
    /// Log file for the `file` sink.
    pub path: Option<PathBuf>,
}

/// `[artifacts]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactsConfig {
    /// Directory that receives case reports and suite summaries.
    pub root: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ARTIFACT_ROOT),
        }
    }
}

/// `[suite]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Cases allowed to run at once.
    pub max_parallel: usize,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ProbeConfig {
    /// Loads configuration using the default resolution rules, then applies
    /// environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overrides, or validation fail.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path)? {
            Some(resolved) => Self::read_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates TOML text without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file without validating it.
    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies `INFRA_PROBE_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override is malformed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        for var in ProbeEnv::OVERRIDES {
            let Some(value) = read_env_nonempty(var.as_str()).map_err(ConfigError::Invalid)? else {
                continue;
            };
            match var {
                ProbeEnv::ProjectId => self.gcp.project_id = Some(value),
                ProbeEnv::TerraformBin => self.terraform.binary = PathBuf::from(value),
                ProbeEnv::TimeoutSec => {
                    self.terraform.timeout_secs =
                        parse_timeout_seconds(var.as_str(), &value).map_err(ConfigError::Invalid)?;
                }
                ProbeEnv::RunRoot => self.artifacts.root = PathBuf::from(value),
                ProbeEnv::ConfigPath => {}
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

impl ProbeConfig {
    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terraform.validate()?;
        self.retry.validate()?;
        self.naming.validate().map_err(|err| ConfigError::Invalid(format!("naming: {err}")))?;
        self.gcp.validate()?;
        self.events.validate()?;
        validate_path_string("artifacts.root", &self.artifacts.root.to_string_lossy())?;
        if self.suite.max_parallel == 0 || self.suite.max_parallel > MAX_PARALLEL {
            return Err(ConfigError::Invalid(format!("suite.max_parallel must be between 1 and {MAX_PARALLEL}")));
        }
        Ok(())
    }
}

impl TerraformConfig {
    /// Validates the `[terraform]` section.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("terraform.binary", &self.binary.to_string_lossy())?;
        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "terraform.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}"
            )));
        }
        for key in self.env.keys() {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                return Err(ConfigError::Invalid(format!("terraform.env key `{key}` is not a valid variable name")));
            }
        }
        Ok(())
    }
}

impl RetryConfig {
    /// Validates the `[retry]` section, compiling every pattern.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!("retry.max_retries must be at most {MAX_RETRIES}")));
        }
        if self.delay_ms > MAX_RETRY_DELAY_MS {
            return Err(ConfigError::Invalid(format!("retry.delay_ms must be at most {MAX_RETRY_DELAY_MS}")));
        }
        if self.patterns.len() > MAX_RETRY_PATTERNS {
            return Err(ConfigError::Invalid(format!(
                "retry.patterns must have at most {MAX_RETRY_PATTERNS} entries"
            )));
        }
        self.compile().map(|_| ())
    }

    /// Compiles the configured patterns.
    fn compile(&self) -> Result<Vec<RetryablePattern>, ConfigError> {
        self.patterns
            .iter()
            .map(|entry| {
                if entry.description.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "retry pattern `{}` needs a description",
                        entry.pattern
                    )));
                }
                RetryablePattern::new(&entry.pattern, entry.description.clone())
                    .map_err(|err| ConfigError::Invalid(format!("retry.patterns: {err}")))
            })
            .collect()
    }
}

impl GcpConfig {
    /// Validates the `[gcp]` section.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(project) = &self.project_id
            && (project.trim().is_empty() || project.chars().any(char::is_whitespace))
        {
            return Err(ConfigError::Invalid("gcp.project_id must be non-empty without whitespace".to_string()));
        }
        for (field, endpoint) in [
            ("gcp.storage_endpoint", &self.storage_endpoint),
            ("gcp.pubsub_endpoint", &self.pubsub_endpoint),
        ] {
            if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
                return Err(ConfigError::Invalid(format!("{field} must be an http or https url")));
            }
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "gcp.request_timeout_secs must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}"
            )));
        }
        match &self.token {
            TokenSource::Static {
                token,
            } if token.trim().is_empty() => {
                Err(ConfigError::Invalid("gcp.token static token must be non-empty".to_string()))
            }
            TokenSource::Env {
                var,
            } if var.trim().is_empty() => {
                Err(ConfigError::Invalid("gcp.token env var must be non-empty".to_string()))
            }
            TokenSource::Gcloud {
                binary,
            } => validate_path_string("gcp.token binary", &binary.to_string_lossy()),
            _ => Ok(()),
        }
    }
}

impl EventsConfig {
    /// Validates the `[events]` section.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkKind::File, None) => {
                Err(ConfigError::Invalid("events.path is required when events.sink = \"file\"".to_string()))
            }
            (EventSinkKind::File, Some(path)) => validate_path_string("events.path", &path.to_string_lossy()),
            (_, Some(_)) => {
                Err(ConfigError::Invalid("events.path is only valid when events.sink = \"file\"".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Harness Mapping
// ============================================================================

impl ProbeConfig {
    /// Builds the retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a pattern does not compile.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let patterns = self.retry.compile()?;
        Ok(RetryPolicy::new(patterns, self.retry.max_retries, Duration::from_millis(self.retry.delay_ms)))
    }

    /// Builds Terraform CLI settings.
    #[must_use]
    pub fn terraform_settings(&self) -> TerraformSettings {
        TerraformSettings {
            binary: self.terraform.binary.clone(),
            timeout: Duration::from_secs(self.terraform.timeout_secs),
            env: self.terraform.env.clone(),
        }
    }

    /// Builds GCP verifier settings.
    #[must_use]
    pub fn gcp_settings(&self) -> GcpSettings {
        GcpSettings {
            storage_endpoint: self.gcp.storage_endpoint.clone(),
            pubsub_endpoint: self.gcp.pubsub_endpoint.clone(),
            request_timeout: Duration::from_secs(self.gcp.request_timeout_secs),
            token: self.gcp.token.clone(),
        }
    }

    /// Opens the configured event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the event log cannot be opened.
    pub fn event_sink(&self) -> Result<Arc<dyn EventSink>, ConfigError> {
        match (self.events.sink, &self.events.path) {
            (EventSinkKind::File, Some(path)) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent)
                        .map_err(|err| ConfigError::Io(format!("{}: {err}", parent.display())))?;
                }
                let sink = FileEventSink::new(path)
                    .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
                Ok(Arc::new(sink))
            }
            (EventSinkKind::File, None) => {
                Err(ConfigError::Invalid("events.path is required when events.sink = \"file\"".to_string()))
            }
            (EventSinkKind::Stderr, _) => Ok(Arc::new(StderrEventSink)),
            (EventSinkKind::None, _) => Ok(Arc::new(NoopEventSink)),
        }
    }

    /// Builds the defaults injected into file-declared cases.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the retry policy is invalid.
    pub fn case_defaults(&self) -> Result<CaseDefaults, ConfigError> {
        Ok(CaseDefaults {
            project_id: self.gcp.project_id.clone(),
            retry: self.retry_policy()?,
        })
    }

    /// Builds a Terraform-backed harness with the configured naming, event
    /// sink, and GCP verifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the terraform binary cannot be found or
    /// the sink or verifier cannot be built.
    pub fn build_harness(&self) -> Result<Harness<TerraformCli>, ConfigError> {
        let tool = TerraformCli::resolve(self.terraform_settings())
            .map_err(|err| ConfigError::Invalid(format!("terraform.binary: {err}")))?;
        let verifier = GcpVerifier::new(self.gcp_settings())
            .map_err(|err| ConfigError::Invalid(format!("gcp: {err}")))?;
        Ok(Harness::new(tool)
            .with_naming(self.naming)
            .with_event_sink(self.event_sink()?)
            .with_verifier(Arc::new(verifier)))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path: explicit, then env, then the default file if present.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = read_env_nonempty(ProbeEnv::ConfigPath.as_str()).map_err(ConfigError::Invalid)? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default.is_file().then_some(default))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path-valued field.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
