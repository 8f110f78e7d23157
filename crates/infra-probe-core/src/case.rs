// crates/infra-probe-core/src/case.rs
// ============================================================================
// Module: Test Cases
// Description: Declarative description of one provisioning scenario.
// Purpose: Capture module, inputs, and expectations before any side effects.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`TestCase`] names a module, its inputs, the unique names to mint, and
//! what must hold after apply. A case with expected-error patterns is a
//! negative case: its apply is supposed to fail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::assertions::OutputAssertion;
use crate::patterns::ErrorPattern;
use crate::patterns::PatternError;
use crate::retry::RetryPolicy;
use crate::vars::VarValue;
use crate::vars::Variables;
use crate::verify::ResourceKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Variable conventionally holding the GCP project identifier.
pub const PROJECT_ID_VARIABLE: &str = "project_id";

// ============================================================================
// SECTION: Module Reference
// ============================================================================

/// Directory holding the infrastructure definition under test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleRef(PathBuf);

impl ModuleRef {
    /// Creates a module reference.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Returns the module directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

// ============================================================================
// SECTION: Unique Name Requests
// ============================================================================

/// Validation applied to a generated name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameKind {
    /// No naming rules beyond the generator's alphabet.
    #[default]
    Generic,
    /// Must satisfy GCS bucket naming rules.
    Bucket,
}

/// Request to bind a freshly generated name to a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueNameSpec {
    /// Variable receiving the name.
    pub variable: String,
    /// Fixed prefix placed before the random suffix.
    pub prefix: String,
    /// Naming rules to enforce.
    #[serde(default)]
    pub kind: NameKind,
    /// Specs with the same group share one random suffix.
    #[serde(default)]
    pub suffix_group: Option<String>,
}

// ============================================================================
// SECTION: Resource Checks
// ============================================================================

/// Provider-side existence check resolved from case variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCheck {
    /// Kind of resource to look up.
    pub kind: ResourceKind,
    /// Variable holding the resource name.
    pub name_variable: String,
    /// Variable holding the project identifier.
    #[serde(default = "default_project_variable")]
    pub project_variable: String,
}

/// Serde default for [`ResourceCheck::project_variable`].
fn default_project_variable() -> String {
    PROJECT_ID_VARIABLE.to_string()
}

// ============================================================================
// SECTION: Test Case
// ============================================================================

/// One provisioning scenario.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Case name used in events and reports.
    pub name: String,
    /// Module under test.
    pub module: ModuleRef,
    /// Explicit inputs.
    pub variables: Variables,
    /// Names generated during prepare.
    pub unique_names: Vec<UniqueNameSpec>,
    /// Patterns the apply failure must match (negative cases only).
    pub expected_errors: Vec<ErrorPattern>,
    /// Post-apply output expectations.
    pub expected_outputs: Vec<OutputAssertion>,
    /// Post-apply provider existence checks.
    pub resource_checks: Vec<ResourceCheck>,
    /// Retry policy for tool steps.
    pub retry: RetryPolicy,
}

impl TestCase {
    /// Starts building a case for `module`.
    #[must_use]
    pub fn builder(name: impl Into<String>, module: impl Into<PathBuf>) -> TestCaseBuilder {
        TestCaseBuilder {
            name: name.into(),
            module: ModuleRef::new(module),
            variables: Variables::new(),
            unique_names: Vec::new(),
            expected_errors: Vec::new(),
            expected_outputs: Vec::new(),
            resource_checks: Vec::new(),
            retry: RetryPolicy::none(),
        }
    }

    /// Returns true when the case expects apply to fail.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        !self.expected_errors.is_empty()
    }
}

/// Builder for [`TestCase`].
#[derive(Debug, Clone)]
pub struct TestCaseBuilder {
    /// Case name.
    name: String,
    /// Module under test.
    module: ModuleRef,
    /// Explicit inputs.
    variables: Variables,
    /// Names generated during prepare.
    unique_names: Vec<UniqueNameSpec>,
    /// Uncompiled expected-error patterns.
    expected_errors: Vec<String>,
    /// Output expectations.
    expected_outputs: Vec<OutputAssertion>,
    /// Provider existence checks.
    resource_checks: Vec<ResourceCheck>,
    /// Retry policy.
    retry: RetryPolicy,
}

impl TestCaseBuilder {
    /// Binds an explicit variable.
    #[must_use]
    pub fn var(mut self, name: impl Into<String>, value: impl Into<VarValue>) -> Self {
        self.variables.insert(name, value);
        self
    }

    /// Binds `project_id`.
    #[must_use]
    pub fn project(self, project_id: impl Into<String>) -> Self {
        self.var(PROJECT_ID_VARIABLE, project_id.into())
    }

    /// Requests a generated name for `variable`.
    #[must_use]
    pub fn unique_name(self, variable: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.push_name(variable.into(), prefix.into(), NameKind::Generic, None)
    }

    /// Requests a generated bucket name for `variable`.
    #[must_use]
    pub fn bucket_name(self, variable: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.push_name(variable.into(), prefix.into(), NameKind::Bucket, None)
    }

    /// Requests a generated name sharing its suffix with the rest of `group`.
    #[must_use]
    pub fn grouped_name(
        self,
        variable: impl Into<String>,
        prefix: impl Into<String>,
        kind: NameKind,
        group: impl Into<String>,
    ) -> Self {
        self.push_name(variable.into(), prefix.into(), kind, Some(group.into()))
    }

    /// Declares an expected apply failure pattern, turning the case negative.
    #[must_use]
    pub fn expect_error(mut self, pattern: impl Into<String>) -> Self {
        self.expected_errors.push(pattern.into());
        self
    }

    /// Adds an output assertion.
    #[must_use]
    pub fn expect_output(mut self, assertion: OutputAssertion) -> Self {
        self.expected_outputs.push(assertion);
        self
    }

    /// Asserts that `output` is non-empty.
    #[must_use]
    pub fn output_non_empty(self, output: impl Into<String>) -> Self {
        self.expect_output(OutputAssertion::NonEmpty {
            output: output.into(),
        })
    }

    /// Asserts that `output` equals `expected`.
    #[must_use]
    pub fn output_equals(self, output: impl Into<String>, expected: impl Into<String>) -> Self {
        self.expect_output(OutputAssertion::Equals {
            output: output.into(),
            expected: expected.into(),
        })
    }

    /// Asserts that `output` passes `variable` through unchanged.
    #[must_use]
    pub fn output_passthrough(self, output: impl Into<String>, variable: impl Into<String>) -> Self {
        self.expect_output(OutputAssertion::EqualsVariable {
            output: output.into(),
            variable: variable.into(),
        })
    }

    /// Adds a provider existence check for the resource named by `name_variable`.
    #[must_use]
    pub fn verify_resource(mut self, kind: ResourceKind, name_variable: impl Into<String>) -> Self {
        self.resource_checks.push(ResourceCheck {
            kind,
            name_variable: name_variable.into(),
            project_variable: default_project_variable(),
        });
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Finishes the case.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when an expected-error pattern is invalid.
    pub fn build(self) -> Result<TestCase, PatternError> {
        let expected_errors = self
            .expected_errors
            .iter()
            .map(|pattern| ErrorPattern::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TestCase {
            name: self.name,
            module: self.module,
            variables: self.variables,
            unique_names: self.unique_names,
            expected_errors,
            expected_outputs: self.expected_outputs,
            resource_checks: self.resource_checks,
            retry: self.retry,
        })
    }

    /// Appends a unique-name request.
    fn push_name(
        mut self,
        variable: String,
        prefix: String,
        kind: NameKind,
        suffix_group: Option<String>,
    ) -> Self {
        self.unique_names.push(UniqueNameSpec {
            variable,
            prefix,
            kind,
            suffix_group,
        });
        self
    }
}
