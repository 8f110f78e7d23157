// system-tests/src/lib.rs
// ============================================================================
// Module: Infra Probe System Tests Library
// Description: Settings shared by the real-cloud system-test suites.
// Purpose: Give every suite one typed view of its environment.
// Dependencies: infra-probe-config
// ============================================================================

//! ## Overview
//! The suites in `system-tests/tests` provision real GCP resources and only
//! build with the `system-tests` feature. Harness settings such as the project
//! id come from the regular `infra-probe` configuration; this crate only adds
//! the knobs that are specific to suite runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod settings;
