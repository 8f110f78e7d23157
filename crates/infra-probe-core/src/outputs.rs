// crates/infra-probe-core/src/outputs.rs
// ============================================================================
// Module: Apply Outputs
// Description: Named values a module exposes after a successful apply.
// Purpose: Decode `terraform output -json` into a typed lookup table.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Terraform prints outputs as `{"name": {"value": ..., "type": ..., "sensitive": bool}}`.
//! Only the values are kept. String lookups render non-string values as
//! compact JSON so assertions can compare lists and maps textually.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Raw per-output entry as printed by Terraform.
#[derive(Debug, Deserialize)]
struct RawOutput {
    /// Materialized value.
    value: Value,
    /// Whether Terraform marked the output sensitive.
    #[serde(default)]
    sensitive: bool,
}

/// Output values of an applied module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outputs {
    /// Output name to value.
    values: BTreeMap<String, Value>,
    /// Names Terraform flagged as sensitive.
    #[serde(default)]
    sensitive: Vec<String>,
}

impl Outputs {
    /// Parses `terraform output -json` text.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the text is not an output document.
    pub fn from_terraform_json(text: &str) -> Result<Self, serde_json::Error> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let raw: BTreeMap<String, RawOutput> = serde_json::from_str(trimmed)?;
        let mut outputs = Self::default();
        for (name, entry) in raw {
            if entry.sensitive {
                outputs.sensitive.push(name.clone());
            }
            outputs.values.insert(name, entry.value);
        }
        Ok(outputs)
    }

    /// Builds outputs from plain values (fakes and fixtures).
    #[must_use]
    pub fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(name, value)| (name.into(), value)).collect(),
            sensitive: Vec::new(),
        }
    }

    /// Returns the raw JSON value of an output.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns an output rendered as a string.
    #[must_use]
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.values.get(name).map(render_value)
    }

    /// Returns true when the output was marked sensitive.
    #[must_use]
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.sensitive.iter().any(|entry| entry == name)
    }

    /// Iterates output names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the module declared no outputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Renders a JSON value the way assertions compare it.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
