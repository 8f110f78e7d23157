// crates/infra-probe-core/src/context.rs
// ============================================================================
// Module: Test Context
// Description: Prepared, immutable inputs for one case execution.
// Purpose: Freeze generated names and variables before the tool runs.
// Dependencies: crate::{case, naming, retry, vars, verify}
// ============================================================================

//! ## Overview
//! Prepare builds a [`TestContext`] from a [`TestCase`]. It generates unique
//! names, binds them to their variables, and checks that the module
//! directory exists. It has no side effects beyond building local state. The
//! context is then shared read-only by apply, verification, and teardown, so
//! every step sees the same names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::case::ModuleRef;
use crate::case::NameKind;
use crate::case::ResourceCheck;
use crate::case::TestCase;
use crate::naming::NameError;
use crate::naming::NamingConfig;
use crate::naming::UniqueName;
use crate::naming::random_suffix;
use crate::naming::validate_bucket_name;
use crate::retry::RetryPolicy;
use crate::vars::Variables;
use crate::verify::ResourceId;
use crate::verify::VerifyError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Prepare failures. Nothing has been provisioned when these occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    /// The module directory does not exist.
    #[error("module directory {} does not exist", .0.display())]
    MissingModule(PathBuf),
    /// A generated name targets a variable that is already bound.
    #[error("variable `{0}` is bound more than once")]
    DuplicateVariable(String),
    /// Name generation or validation failed.
    #[error(transparent)]
    Naming(#[from] NameError),
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Variables and generated names bound to one module for one case.
#[derive(Debug, Clone)]
pub struct TestContext {
    /// Case name.
    case_name: String,
    /// Module under test.
    module: ModuleRef,
    /// Full variable set, generated names included.
    variables: Variables,
    /// Generated names keyed by variable.
    unique_names: BTreeMap<String, UniqueName>,
    /// Retry policy applied to every tool step of the case.
    retry: RetryPolicy,
}

impl TestContext {
    /// Prepares a context for `case`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepareError`] when the module is missing, a name collides
    /// with an explicit variable, or a generated name is invalid.
    pub fn prepare(case: &TestCase, naming: &NamingConfig) -> Result<Self, PrepareError> {
        naming.validate()?;
        if !case.module.path().is_dir() {
            return Err(PrepareError::MissingModule(case.module.path().to_path_buf()));
        }
        let mut variables = case.variables.clone();
        let mut unique_names = BTreeMap::new();
        let mut group_suffixes: BTreeMap<&str, String> = BTreeMap::new();
        for spec in &case.unique_names {
            if variables.contains(&spec.variable) {
                return Err(PrepareError::DuplicateVariable(spec.variable.clone()));
            }
            let suffix = match spec.suffix_group.as_deref() {
                Some(group) => group_suffixes
                    .entry(group)
                    .or_insert_with(|| random_suffix(naming.suffix_length))
                    .clone(),
                None => random_suffix(naming.suffix_length),
            };
            let name = UniqueName::with_suffix(&spec.prefix, &suffix);
            if spec.kind == NameKind::Bucket {
                validate_bucket_name(name.as_str())?;
            }
            variables.insert(spec.variable.clone(), name.as_str());
            unique_names.insert(spec.variable.clone(), name);
        }
        Ok(Self {
            case_name: case.name.clone(),
            module: case.module.clone(),
            variables,
            unique_names,
            retry: case.retry.clone(),
        })
    }

    /// Builds a context from fixed inputs without name generation.
    #[must_use]
    pub fn from_parts(case_name: impl Into<String>, module: ModuleRef, variables: Variables) -> Self {
        Self {
            case_name: case_name.into(),
            module,
            variables,
            unique_names: BTreeMap::new(),
            retry: RetryPolicy::none(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the case name.
    #[must_use]
    pub fn case_name(&self) -> &str {
        &self.case_name
    }

    /// Returns the module under test.
    #[must_use]
    pub const fn module(&self) -> &ModuleRef {
        &self.module
    }

    /// Returns the bound variables.
    #[must_use]
    pub const fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Returns the string value of a variable.
    #[must_use]
    pub fn var_str(&self, name: &str) -> Option<&str> {
        self.variables.get_str(name)
    }

    /// Returns the name generated for `variable`.
    #[must_use]
    pub fn unique_name(&self, variable: &str) -> Option<&UniqueName> {
        self.unique_names.get(variable)
    }

    /// Iterates generated names as `(variable, name)` pairs.
    pub fn unique_names(&self) -> impl Iterator<Item = (&str, &UniqueName)> {
        self.unique_names.iter().map(|(variable, name)| (variable.as_str(), name))
    }

    /// Resolves a resource check against the bound variables.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::UnknownVariable`] when either variable is unbound.
    pub fn resolve(&self, check: &ResourceCheck) -> Result<ResourceId, VerifyError> {
        let lookup = |name: &str| {
            self.var_str(name)
                .map(str::to_string)
                .ok_or_else(|| VerifyError::UnknownVariable(name.to_string()))
        };
        Ok(ResourceId {
            kind: check.kind,
            project: lookup(&check.project_variable)?,
            name: lookup(&check.name_variable)?,
        })
    }
}
