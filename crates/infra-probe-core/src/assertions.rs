// crates/infra-probe-core/src/assertions.rs
// ============================================================================
// Module: Output Assertions
// Description: Declarative checks over apply outputs.
// Purpose: Express the usual post-apply expectations without custom code.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Assertions compare rendered output strings. `EqualsVariable` covers
//! pass-through outputs such as IAM `role` and `member`, which must equal the
//! values the case supplied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::outputs::Outputs;
use crate::vars::Variables;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Expectation about one apply output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum OutputAssertion {
    /// Output exists and renders to a non-empty string.
    NonEmpty {
        /// Output name.
        output: String,
    },
    /// Output equals a literal.
    Equals {
        /// Output name.
        output: String,
        /// Expected rendered value.
        expected: String,
    },
    /// Output equals the value bound to a case variable.
    EqualsVariable {
        /// Output name.
        output: String,
        /// Variable whose value the output must reproduce.
        variable: String,
    },
    /// Output contains a substring.
    Contains {
        /// Output name.
        output: String,
        /// Required substring.
        needle: String,
    },
}

impl OutputAssertion {
    /// Returns the output this assertion inspects.
    #[must_use]
    pub fn output(&self) -> &str {
        match self {
            Self::NonEmpty {
                output,
            }
            | Self::Equals {
                output, ..
            }
            | Self::EqualsVariable {
                output, ..
            }
            | Self::Contains {
                output, ..
            } => output,
        }
    }

    /// Evaluates the assertion.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch.
    pub fn check(&self, outputs: &Outputs, variables: &Variables) -> Result<(), String> {
        let name = self.output();
        let Some(actual) = outputs.get_string(name) else {
            return Err(format!("output `{name}` was not declared by the module"));
        };
        match self {
            Self::NonEmpty {
                ..
            } => {
                if actual.is_empty() {
                    return Err(format!("output `{name}` is empty"));
                }
            }
            Self::Equals {
                expected, ..
            } => {
                if &actual != expected {
                    return Err(format!("output `{name}` is `{actual}`, expected `{expected}`"));
                }
            }
            Self::EqualsVariable {
                variable, ..
            } => {
                let Some(expected) = variables.get(variable) else {
                    return Err(format!("output `{name}` compares against unknown variable `{variable}`"));
                };
                let expected = expected.to_string();
                if actual != expected {
                    return Err(format!(
                        "output `{name}` is `{actual}`, expected variable `{variable}` value `{expected}`"
                    ));
                }
            }
            Self::Contains {
                needle, ..
            } => {
                if !actual.contains(needle.as_str()) {
                    return Err(format!("output `{name}` (`{actual}`) does not contain `{needle}`"));
                }
            }
        }
        Ok(())
    }
}

/// Evaluates every assertion and returns all mismatches.
#[must_use]
pub fn check_all(
    assertions: &[OutputAssertion],
    outputs: &Outputs,
    variables: &Variables,
) -> Vec<String> {
    assertions.iter().filter_map(|assertion| assertion.check(outputs, variables).err()).collect()
}
