// crates/infra-probe-diagram/src/model.rs
// ============================================================================
// Module: Resource Model
// Description: Managed resources extracted from Terraform JSON documents.
// Purpose: Carry the fields diagrams need, in document order.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`Resource`] is one managed Terraform resource. An [`Inventory`] keeps
//! resources keyed by address in first-seen order, so diagrams render
//! deterministically for a given input document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Categories
// ============================================================================

/// Diagram grouping for resource types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Buckets and object storage.
    Storage,
    /// Serverless and compute services.
    Compute,
    /// Database instances and databases.
    Database,
    /// Service accounts and IAM bindings.
    Iam,
    /// Dashboards and log sinks.
    Monitoring,
    /// Anything unrecognised.
    Other,
}

impl Category {
    /// Categorises a Terraform resource type.
    #[must_use]
    pub fn for_type(resource_type: &str) -> Self {
        match resource_type {
            "google_storage_bucket" => Self::Storage,
            "google_cloud_run_service" => Self::Compute,
            "google_sql_database_instance" | "google_sql_database" => Self::Database,
            "google_service_account"
            | "google_project_iam_member"
            | "google_storage_bucket_iam_member"
            | "google_cloud_run_service_iam_member" => Self::Iam,
            "google_monitoring_dashboard" | "google_logging_project_sink" => Self::Monitoring,
            _ => Self::Other,
        }
    }

    /// Subgraph title.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Storage => "Storage",
            Self::Compute => "Compute",
            Self::Database => "Database",
            Self::Iam => "IAM",
            Self::Monitoring => "Monitoring",
            Self::Other => "Other",
        }
    }

    /// Node fill colour.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Storage => "#4285f4",
            Self::Compute => "#34a853",
            Self::Database => "#fbbc04",
            Self::Iam => "#ea4335",
            Self::Monitoring => "#9c27b0",
            Self::Other => "#607d8b",
        }
    }
}

// ============================================================================
// SECTION: Resources
// ============================================================================

/// One managed Terraform resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Resource type, such as `google_storage_bucket`.
    pub resource_type: String,
    /// Resource name within its module.
    pub name: String,
    /// Address used as the identity key.
    pub address: String,
    /// Provider name.
    pub provider: String,
    /// Attribute values.
    pub attributes: Map<String, Value>,
    /// Addresses this resource depends on.
    pub dependencies: Vec<String>,
}

impl Resource {
    /// Returns the resource category.
    #[must_use]
    pub fn category(&self) -> Category {
        Category::for_type(&self.resource_type)
    }

    /// Returns the node icon.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self.resource_type.as_str() {
            "google_storage_bucket" => "📦",
            "google_cloud_run_service" => "🚀",
            "google_sql_database_instance" => "🗄️",
            "google_sql_database" => "💾",
            "google_service_account" => "👤",
            "google_monitoring_dashboard" => "📊",
            "google_logging_project_sink" => "📝",
            _ => "🔧",
        }
    }

    /// Returns the name with dashes as spaces, each word capitalised.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut previous_alpha = false;
        for ch in self.name.replace('-', " ").chars() {
            if ch.is_alphabetic() {
                if previous_alpha {
                    out.extend(ch.to_lowercase());
                } else {
                    out.extend(ch.to_uppercase());
                }
                previous_alpha = true;
            } else {
                out.push(ch);
                previous_alpha = false;
            }
        }
        out
    }

    /// Returns the `name` attribute rendered for a label.
    #[must_use]
    pub fn name_attribute(&self) -> Option<String> {
        match self.attributes.get("name")? {
            Value::String(value) => Some(value.clone()),
            other => Some(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Inventory
// ============================================================================

/// Resources keyed by address, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Resources in insertion order.
    resources: Vec<Resource>,
    /// Address to position in `resources`.
    index: HashMap<String, usize>,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a resource. A repeated address replaces the earlier entry in place.
    pub fn insert(&mut self, resource: Resource) {
        if let Some(&position) = self.index.get(&resource.address) {
            self.resources[position] = resource;
            return;
        }
        self.index.insert(resource.address.clone(), self.resources.len());
        self.resources.push(resource);
    }

    /// Returns the resource at `address`.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<&Resource> {
        self.index.get(address).map(|&position| &self.resources[position])
    }

    /// Returns whether `address` is present.
    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.index.contains_key(address)
    }

    /// Iterates resources in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the inventory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
