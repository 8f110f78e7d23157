// crates/infra-probe-core/src/lib.rs
// ============================================================================
// Module: Infra Probe Core Library
// Description: Provisioning test harness for infrastructure modules.
// Purpose: Apply a module, check what it built, and always tear it down.
// Dependencies: rand, regex, serde, thiserror, tokio, toml, which
// ============================================================================

//! ## Overview
//! `infra-probe-core` runs infrastructure test cases through a fixed
//! lifecycle: prepare (bind variables and mint unique names), apply, verify
//! outputs and provider state, then tear down. Teardown is guaranteed by a
//! scoped guard and runs exactly once per case, except for negative cases
//! whose apply failed with an expected error.
//!
//! The provisioning tool and the provider read API sit behind traits
//! ([`ProvisioningTool`], [`ResourceVerifier`]). [`TerraformCli`] is the
//! production tool; tests substitute scripted fakes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assertions;
pub mod case;
pub mod case_file;
pub mod context;
pub mod events;
pub mod harness;
pub mod module_lock;
pub mod naming;
pub mod outputs;
pub mod patterns;
pub mod report;
pub mod retry;
pub mod suite;
pub mod terraform;
pub mod tool;
pub mod vars;
pub mod verify;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assertions::OutputAssertion;
pub use assertions::check_all;
pub use case::ModuleRef;
pub use case::NameKind;
pub use case::PROJECT_ID_VARIABLE;
pub use case::ResourceCheck;
pub use case::TestCase;
pub use case::TestCaseBuilder;
pub use case::UniqueNameSpec;
pub use case_file::CaseDefaults;
pub use case_file::CaseFile;
pub use case_file::CaseFileError;
pub use context::PrepareError;
pub use context::TestContext;
pub use events::EventSink;
pub use events::FileEventSink;
pub use events::HarnessEvent;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use harness::AppliedCase;
pub use harness::ApplyError;
pub use harness::CaseError;
pub use harness::CaseFailure;
pub use harness::CaseOutcome;
pub use harness::CasePhase;
pub use harness::CaseReport;
pub use harness::Harness;
pub use harness::TeardownGuard;
pub use module_lock::ModuleLocks;
pub use naming::NameError;
pub use naming::NamingConfig;
pub use naming::UniqueName;
pub use naming::validate_bucket_name;
pub use outputs::Outputs;
pub use patterns::ErrorPattern;
pub use patterns::PatternError;
pub use report::ReportWriter;
pub use report::SuiteSummary;
pub use retry::RetryPolicy;
pub use retry::RetryablePattern;
pub use suite::CaseResult;
pub use suite::run_suite;
pub use terraform::TerraformCli;
pub use terraform::TerraformSettings;
pub use tool::ProvisioningTool;
pub use tool::ToolError;
pub use tool::ToolOutput;
pub use tool::ToolStep;
pub use vars::VarValue;
pub use vars::Variables;
pub use verify::ResourceId;
pub use verify::ResourceKind;
pub use verify::ResourceVerifier;
pub use verify::VerifyError;
