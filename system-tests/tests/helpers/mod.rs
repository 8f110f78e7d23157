// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Harness fixture and run artifacts shared by the suites.
// Purpose: Keep each suite file down to the cases it declares.
// Dependencies: system-tests, infra-probe-config, infra-probe-core
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
pub mod harness;
