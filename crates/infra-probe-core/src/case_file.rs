// crates/infra-probe-core/src/case_file.rs
// ============================================================================
// Module: Case Files
// Description: TOML declarations of test cases.
// Purpose: Let suites be described as data and run from the CLI.
// Dependencies: serde, toml, crate::case
// ============================================================================

//! ## Overview
//! A case file holds one or more `[[cases]]` tables. Module paths resolve
//! relative to the file's directory. Cases without an explicit `project_id`
//! inherit the configured project, and cases use the configured retry policy
//! unless they set `retry = false`.
//!
//! ```toml
//! [[cases]]
//! name = "bucket-default"
//! module = "../modules/gcs-bucket-root"
//!
//! [[cases.unique_names]]
//! variable = "bucket_name"
//! prefix = "test-bucket"
//! kind = "bucket"
//!
//! [[cases.outputs]]
//! check = "non_empty"
//! output = "bucket_url"
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::assertions::OutputAssertion;
use crate::case::ModuleRef;
use crate::case::PROJECT_ID_VARIABLE;
use crate::case::ResourceCheck;
use crate::case::TestCase;
use crate::case::UniqueNameSpec;
use crate::patterns::ErrorPattern;
use crate::retry::RetryPolicy;
use crate::vars::Variables;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum case file size in bytes.
pub const MAX_CASE_FILE_SIZE: usize = 256 * 1024;
/// Maximum number of cases per file.
pub const MAX_CASES_PER_FILE: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Case file loading errors.
#[derive(Debug, Error)]
pub enum CaseFileError {
    /// I/O failure while reading the file.
    #[error("case file io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("case file parse error: {0}")]
    Parse(String),
    /// Structurally valid but unusable content.
    #[error("invalid case file: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Values injected into every case loaded from a file.
#[derive(Debug, Clone, Default)]
pub struct CaseDefaults {
    /// Project bound to `project_id` when a case omits it.
    pub project_id: Option<String>,
    /// Retry policy for cases that do not opt out.
    pub retry: RetryPolicy,
}

// ============================================================================
// SECTION: File Model
// ============================================================================

/// Parsed case file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseFile {
    /// Declared cases.
    #[serde(default)]
    pub cases: Vec<CaseSpec>,
}

/// One declared case.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseSpec {
    /// Case name.
    pub name: String,
    /// Module directory, relative to the case file.
    pub module: PathBuf,
    /// Explicit inputs.
    #[serde(default)]
    pub variables: Variables,
    /// Generated names.
    #[serde(default)]
    pub unique_names: Vec<UniqueNameSpec>,
    /// Expected apply failure patterns.
    #[serde(default)]
    pub expected_errors: Vec<String>,
    /// Output assertions.
    #[serde(default)]
    pub outputs: Vec<OutputAssertion>,
    /// Provider existence checks.
    #[serde(default)]
    pub resources: Vec<ResourceCheck>,
    /// Whether the configured retry policy applies.
    #[serde(default = "default_retry")]
    pub retry: bool,
}

/// Serde default for [`CaseSpec::retry`].
const fn default_retry() -> bool {
    true
}

impl CaseFile {
    /// Parses case file text.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFileError`] when the text is not a valid case file.
    pub fn parse(text: &str) -> Result<Self, CaseFileError> {
        let file: Self = toml::from_str(text).map_err(|err| CaseFileError::Parse(err.to_string()))?;
        file.validate()?;
        Ok(file)
    }

    /// Loads and validates a case file.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFileError`] when the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, CaseFileError> {
        let bytes = fs::read(path)
            .map_err(|err| CaseFileError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CASE_FILE_SIZE {
            return Err(CaseFileError::Invalid("case file exceeds size limit".to_string()));
        }
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| CaseFileError::Invalid("case file must be utf-8".to_string()))?;
        Self::parse(text)
    }

    /// Loads a case file and converts every case.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFileError`] when loading or conversion fails.
    pub fn load_cases(path: &Path, defaults: &CaseDefaults) -> Result<Vec<TestCase>, CaseFileError> {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::load(path)?.into_cases(base, defaults)
    }

    /// Converts declarations into test cases, resolving modules against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFileError::Invalid`] when a pattern does not compile.
    pub fn into_cases(self, base: &Path, defaults: &CaseDefaults) -> Result<Vec<TestCase>, CaseFileError> {
        self.cases.into_iter().map(|spec| spec.into_case(base, defaults)).collect()
    }

    /// Checks limits and name uniqueness.
    fn validate(&self) -> Result<(), CaseFileError> {
        if self.cases.is_empty() {
            return Err(CaseFileError::Invalid("case file declares no cases".to_string()));
        }
        if self.cases.len() > MAX_CASES_PER_FILE {
            return Err(CaseFileError::Invalid("case file declares too many cases".to_string()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for case in &self.cases {
            if case.name.trim().is_empty() {
                return Err(CaseFileError::Invalid("case name must be non-empty".to_string()));
            }
            if !seen.insert(case.name.as_str()) {
                return Err(CaseFileError::Invalid(format!("duplicate case name `{}`", case.name)));
            }
        }
        Ok(())
    }
}

impl CaseSpec {
    /// Converts one declaration into a test case.
    fn into_case(self, base: &Path, defaults: &CaseDefaults) -> Result<TestCase, CaseFileError> {
        let expected_errors = self
            .expected_errors
            .iter()
            .map(|pattern| ErrorPattern::new(pattern))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| CaseFileError::Invalid(format!("case `{}`: {err}", self.name)))?;
        let mut variables = self.variables;
        if !variables.contains(PROJECT_ID_VARIABLE)
            && let Some(project) = &defaults.project_id
        {
            variables.insert(PROJECT_ID_VARIABLE, project.as_str());
        }
        let module = if self.module.is_absolute() { self.module } else { base.join(self.module) };
        Ok(TestCase {
            name: self.name,
            module: ModuleRef::new(module),
            variables,
            unique_names: self.unique_names,
            expected_errors,
            expected_outputs: self.outputs,
            resource_checks: self.resources,
            retry: if self.retry { defaults.retry.clone() } else { RetryPolicy::none() },
        })
    }
}
