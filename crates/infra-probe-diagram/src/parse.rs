// crates/infra-probe-diagram/src/parse.rs
// ============================================================================
// Module: Terraform Document Parsing
// Description: Extracts managed resources from state and plan JSON.
// Purpose: Accept every shape `terraform show -json` and state files produce.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Three document shapes are recognised, checked in this order:
//! - plan JSON: `planned_values.root_module`
//! - state JSON from `terraform show -json`: `values.root_module`
//! - raw state files: top-level `resources[].instances[]`
//!
//! Module trees are walked through `child_modules` recursively. Data sources
//! and any other non-managed mode are skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde_json::Map;
use serde_json::Value;

use crate::DiagramError;
use crate::model::Inventory;
use crate::model::Resource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest document accepted.
pub const MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Reads and parses a Terraform JSON document from disk.
///
/// # Errors
///
/// Returns [`DiagramError::Io`] when the file cannot be read and
/// [`DiagramError::Parse`] when it is not a JSON object.
pub fn parse_file(path: &Path) -> Result<Inventory, DiagramError> {
    let bytes = fs::read(path).map_err(|err| DiagramError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_DOCUMENT_SIZE {
        return Err(DiagramError::Parse(format!("{} exceeds the size limit", path.display())));
    }
    let document: Value =
        serde_json::from_slice(&bytes).map_err(|err| DiagramError::Parse(format!("{}: {err}", path.display())))?;
    parse_document(&document)
}

/// Parses Terraform JSON text.
///
/// # Errors
///
/// Returns [`DiagramError::Parse`] when the text is not a JSON object.
pub fn parse_str(text: &str) -> Result<Inventory, DiagramError> {
    let document: Value = serde_json::from_str(text).map_err(|err| DiagramError::Parse(err.to_string()))?;
    parse_document(&document)
}

/// Extracts managed resources from a parsed document.
///
/// # Errors
///
/// Returns [`DiagramError::Parse`] when the document is not a JSON object.
pub fn parse_document(document: &Value) -> Result<Inventory, DiagramError> {
    let Some(root) = document.as_object() else {
        return Err(DiagramError::Parse("terraform document must be a JSON object".to_string()));
    };
    let mut inventory = Inventory::new();
    if let Some(planned) = root.get("planned_values") {
        walk_module(module_root(planned), &mut inventory);
    } else if let Some(values) = root.get("values") {
        walk_module(module_root(values), &mut inventory);
    } else {
        for resource in array(root.get("resources")) {
            push_legacy(resource, &mut inventory);
        }
    }
    Ok(inventory)
}

// ============================================================================
// SECTION: Module Walking
// ============================================================================

/// Returns the `root_module` of a values section.
fn module_root(section: &Value) -> Option<&Value> {
    section.get("root_module")
}

/// Adds a module's resources, then its children.
fn walk_module(module: Option<&Value>, inventory: &mut Inventory) {
    let Some(module) = module else {
        return;
    };
    for resource in array(module.get("resources")) {
        push_module_resource(resource, inventory);
    }
    for child in array(module.get("child_modules")) {
        walk_module(Some(child), inventory);
    }
}

/// Adds a resource shaped like `planned_values` / `values` entries.
fn push_module_resource(resource: &Value, inventory: &mut Inventory) {
    if !is_managed(resource) {
        return;
    }
    let resource_type = text(resource, "type");
    let name = text(resource, "name");
    let address = resource
        .get("address")
        .and_then(Value::as_str)
        .map_or_else(|| format!("{resource_type}.{name}"), str::to_string);
    inventory.insert(Resource {
        provider: text(resource, "provider_name"),
        attributes: object(resource.get("values")),
        dependencies: strings(resource.get("depends_on")),
        resource_type,
        name,
        address,
    });
}

/// Adds every instance of a raw state file resource.
fn push_legacy(resource: &Value, inventory: &mut Inventory) {
    if !is_managed(resource) {
        return;
    }
    let resource_type = text(resource, "type");
    let name = text(resource, "name");
    let provider = text(resource, "provider");
    for instance in array(resource.get("instances")) {
        inventory.insert(Resource {
            resource_type: resource_type.clone(),
            name: name.clone(),
            address: format!("{resource_type}.{name}"),
            provider: provider.clone(),
            attributes: object(instance.get("attributes")),
            dependencies: strings(instance.get("dependencies")),
        });
    }
}

// ============================================================================
// SECTION: Field Helpers
// ============================================================================

/// Resources without a mode count as managed.
fn is_managed(resource: &Value) -> bool {
    resource.get("mode").and_then(Value::as_str).is_none_or(|mode| mode == "managed")
}

/// String field, empty when absent.
fn text(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Array field, empty when absent.
fn array(value: Option<&Value>) -> &[Value] {
    value.and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

/// Object field, empty when absent.
fn object(value: Option<&Value>) -> Map<String, Value> {
    value.and_then(Value::as_object).cloned().unwrap_or_default()
}

/// String entries of an array field.
fn strings(value: Option<&Value>) -> Vec<String> {
    array(value).iter().filter_map(Value::as_str).map(str::to_string).collect()
}
