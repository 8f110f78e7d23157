// crates/infra-probe-diagram/src/lib.rs
// ============================================================================
// Module: Infra Probe Diagram Library
// Description: Terraform state and plan JSON to Mermaid diagrams.
// Purpose: Document what a module provisions alongside its tests.
// Dependencies: regex, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `infra-probe-diagram` reads the JSON produced by `terraform show -json`
//! (for a plan or for state) or a raw state file, collects the managed
//! resources, and renders Mermaid diagrams as raw source or fenced Markdown.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod model;
pub mod parse;
pub mod render;

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use model::Category;
pub use model::Inventory;
pub use model::Resource;
pub use parse::parse_document;
pub use parse::parse_file;
pub use parse::parse_str;
pub use render::DiagramKind;
pub use render::DiagramSelection;
pub use render::OutputFormat;
pub use render::RenderedDiagram;
pub use render::node_id;
pub use render::render_all;
pub use render::write_all;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Diagram generation errors.
#[derive(Debug, Error)]
pub enum DiagramError {
    /// Reading input or writing output failed.
    #[error("diagram io error: {0}")]
    Io(String),
    /// Input is not a Terraform JSON document.
    #[error("diagram parse error: {0}")]
    Parse(String),
}
