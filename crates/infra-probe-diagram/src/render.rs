// crates/infra-probe-diagram/src/render.rs
// ============================================================================
// Module: Mermaid Rendering
// Description: Architecture, network, and data-flow diagrams in Mermaid.
// Purpose: Turn an inventory into diagram text and output files.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! The architecture diagram is derived from the inventory: one subgraph per
//! category in first-seen order, declared dependency edges, inferred Cloud
//! Run to Cloud SQL edges, and per-node styles. The network and data-flow
//! diagrams are fixed reference topologies.
//!
//! Output files are named `<stem>-<kind><ext>` next to the requested output
//! path, or `<kind>.mmd` when none is given. Markdown output wraps the diagram
//! in a `mermaid` fence and uses the `.md` extension.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::DiagramError;
use crate::model::Category;
use crate::model::Inventory;

// ============================================================================
// SECTION: Selection
// ============================================================================

/// A single diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    /// Resources grouped by category with dependencies.
    Architecture,
    /// Reference network topology.
    Network,
    /// Reference request data flow.
    Dataflow,
}

impl DiagramKind {
    /// Label used in file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Network => "network",
            Self::Dataflow => "dataflow",
        }
    }

    /// Renders this diagram.
    #[must_use]
    pub fn render(self, inventory: &Inventory) -> String {
        match self {
            Self::Architecture => architecture_diagram(inventory),
            Self::Network => network_diagram(),
            Self::Dataflow => dataflow_diagram(),
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which diagrams to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiagramSelection {
    /// Architecture only.
    #[default]
    Architecture,
    /// Network only.
    Network,
    /// Data flow only.
    Dataflow,
    /// All three, in architecture, network, data-flow order.
    All,
}

impl DiagramSelection {
    /// Returns the selected kinds in output order.
    #[must_use]
    pub fn kinds(self) -> Vec<DiagramKind> {
        match self {
            Self::Architecture => vec![DiagramKind::Architecture],
            Self::Network => vec![DiagramKind::Network],
            Self::Dataflow => vec![DiagramKind::Dataflow],
            Self::All => vec![DiagramKind::Architecture, DiagramKind::Network, DiagramKind::Dataflow],
        }
    }
}

/// Output encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Raw Mermaid source.
    #[default]
    Mermaid,
    /// Mermaid inside a fenced Markdown block.
    Markdown,
}

impl OutputFormat {
    /// Wraps diagram text for this format.
    #[must_use]
    pub fn wrap(self, diagram: &str) -> String {
        match self {
            Self::Mermaid => diagram.to_string(),
            Self::Markdown => format!("```mermaid\n{diagram}\n```"),
        }
    }
}

// ============================================================================
// SECTION: Node Ids
// ============================================================================

/// First quoted index key, as in `["run.googleapis.com"]`.
static QUOTED_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#"\["([^"]+)"\]"#).ok());
/// Any bracketed index.
static BRACKETS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\[.*?\]").ok());

/// Converts a resource address into a Mermaid node id.
///
/// Index brackets are removed. A quoted key contributes `_<first label>` so
/// `for_each` instances stay distinct. Dots and dashes become underscores.
#[must_use]
pub fn node_id(address: &str) -> String {
    let suffix = QUOTED_KEY
        .as_ref()
        .and_then(|regex| regex.captures(address))
        .and_then(|captures| captures.get(1))
        .map(|key| {
            let head = key.as_str().split('.').next().unwrap_or_default();
            format!("_{}", head.replace('-', "_"))
        })
        .unwrap_or_default();
    let stripped = BRACKETS
        .as_ref()
        .map_or_else(|| address.to_string(), |regex| regex.replace_all(address, "").into_owned());
    format!("{}{suffix}", stripped.replace(['.', '-'], "_"))
}

// ============================================================================
// SECTION: Diagrams
// ============================================================================

/// Renders the architecture diagram.
#[must_use]
pub fn architecture_diagram(inventory: &Inventory) -> String {
    let mut lines = vec!["graph TB".to_string(), String::new()];

    let mut categories: Vec<Category> = Vec::new();
    for resource in inventory.iter() {
        if !categories.contains(&resource.category()) {
            categories.push(resource.category());
        }
    }
    for category in categories {
        lines.push(format!("    subgraph {}", category.as_str()));
        for resource in inventory.iter().filter(|resource| resource.category() == category) {
            let mut label = format!("{} {}", resource.icon(), resource.display_name());
            if matches!(resource.resource_type.as_str(), "google_storage_bucket" | "google_sql_database")
                && let Some(name) = resource.name_attribute()
            {
                label.push_str("<br/>");
                label.push_str(&name);
            }
            lines.push(format!("        {}[{label}]", node_id(&resource.address)));
        }
        lines.push("    end".to_string());
        lines.push(String::new());
    }

    lines.push("    %% Dependencies".to_string());
    for resource in inventory.iter() {
        let source = node_id(&resource.address);
        for dependency in &resource.dependencies {
            if inventory.contains(dependency) {
                lines.push(format!("    {source} --> {}", node_id(dependency)));
            }
        }
        if resource.resource_type == "google_cloud_run_service" {
            for dependency in resource.dependencies.iter().filter(|dep| dep.contains("google_sql_database_instance")) {
                lines.push(format!("    {source} -.->|connects to| {}", node_id(dependency)));
            }
        }
    }
    lines.push(String::new());

    lines.push("    %% Styling".to_string());
    for resource in inventory.iter() {
        lines.push(format!(
            "    style {} fill:{},stroke:#333,color:#fff",
            node_id(&resource.address),
            resource.category().color()
        ));
    }
    lines.join("\n")
}

/// Renders the reference network topology.
#[must_use]
pub fn network_diagram() -> String {
    [
        "graph LR",
        "",
        "    Internet([Internet]) --> LB[Load Balancer]",
        "    LB --> Frontend[Frontend]",
        "    Frontend --> API[API Backend]",
        "    API --> DB[(Database)]",
        "    API --> Storage[Document Storage]",
        "",
        "    style Internet fill:#f9f,stroke:#333",
        "    style Frontend fill:#4285f4,stroke:#333,color:#fff",
        "    style API fill:#34a853,stroke:#333,color:#fff",
        "    style DB fill:#fbbc04,stroke:#333,color:#fff",
        "    style Storage fill:#4285f4,stroke:#333,color:#fff",
    ]
    .join("\n")
}

/// Renders the reference request data flow.
#[must_use]
pub fn dataflow_diagram() -> String {
    [
        "graph TD",
        "",
        "    User([User]) --> Frontend[Frontend UI]",
        "    Frontend --> API[API Service]",
        "    API --> Auth{Authentication}",
        "    Auth -->|Valid| DB[(Database)]",
        "    Auth -->|Invalid| Error[Error Response]",
        "    DB --> Cache[(Cache Layer)]",
        "    Cache --> API",
        "    API --> Storage[Document Storage]",
        "    API --> Logs[Cloud Logging]",
        "    API --> Metrics[Cloud Monitoring]",
        "",
        "    style User fill:#f9f,stroke:#333",
        "    style Auth fill:#ea4335,stroke:#333,color:#fff",
        "    style DB fill:#fbbc04,stroke:#333,color:#fff",
    ]
    .join("\n")
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// A rendered diagram and where it belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    /// Diagram kind.
    pub kind: DiagramKind,
    /// Destination file.
    pub path: PathBuf,
    /// File contents.
    pub content: String,
}

/// Computes the destination file for `kind`.
#[must_use]
pub fn output_path(output: Option<&Path>, kind: DiagramKind, format: OutputFormat) -> PathBuf {
    let path = output.map_or_else(
        || PathBuf::from(format!("{kind}.mmd")),
        |output| {
            let stem = output.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
            let suffix =
                output.extension().map(|ext| format!(".{}", ext.to_string_lossy())).unwrap_or_default();
            let parent = output.parent().unwrap_or_else(|| Path::new(""));
            parent.join(format!("{stem}-{kind}{suffix}"))
        },
    );
    match format {
        OutputFormat::Mermaid => path,
        OutputFormat::Markdown => path.with_extension("md"),
    }
}

/// Renders the selected diagrams without touching the filesystem.
#[must_use]
pub fn render_all(
    inventory: &Inventory,
    selection: DiagramSelection,
    format: OutputFormat,
    output: Option<&Path>,
) -> Vec<RenderedDiagram> {
    selection
        .kinds()
        .into_iter()
        .map(|kind| RenderedDiagram {
            kind,
            path: output_path(output, kind, format),
            content: format.wrap(&kind.render(inventory)),
        })
        .collect()
}

/// Writes rendered diagrams, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`DiagramError::Io`] when a file cannot be written.
pub fn write_all(diagrams: &[RenderedDiagram]) -> Result<(), DiagramError> {
    for diagram in diagrams {
        if let Some(parent) = diagram.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| DiagramError::Io(format!("{}: {err}", parent.display())))?;
        }
        fs::write(&diagram.path, &diagram.content)
            .map_err(|err| DiagramError::Io(format!("{}: {err}", diagram.path.display())))?;
    }
    Ok(())
}
