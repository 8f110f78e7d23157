// crates/infra-probe-config/src/lib.rs
// ============================================================================
// Module: Infra Probe Config Library
// Description: Configuration model, loading, and environment overrides.
// Purpose: Single source of truth for infra-probe.toml semantics.
// Dependencies: infra-probe-core, infra-probe-gcp, serde, toml
// ============================================================================

//! ## Overview
//! `infra-probe-config` loads `infra-probe.toml`, applies `INFRA_PROBE_*`
//! environment overrides, and validates the result fail-closed. Validated
//! configs map onto the harness, Terraform, and GCP verifier types.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::ProbeEnv;
pub use env::read_env_nonempty;
pub use env::read_env_strict;
