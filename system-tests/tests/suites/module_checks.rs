// system-tests/tests/suites/module_checks.rs
// ============================================================================
// Module: Module Checks
// Description: Validate and plan a module, then feed it a rejected input.
// Purpose: Cover the lifecycle steps that provision nothing.
// Dependencies: system-tests helpers, infra-probe-core
// ============================================================================

//! ## Overview
//! All checks share the `gcs-bucket` module directory, so they run in one test
//! to keep Terraform's working state from being initialised concurrently.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use infra_probe_core::CaseOutcome;
use infra_probe_core::CasePhase;
use infra_probe_core::TestCase;

use crate::helpers::harness::Fixture;

#[test]
fn bucket_module_validates_plans_and_rejects_bad_names() {
    let fixture = Fixture::load().expect("fixture");
    let module = fixture.module("gcs-bucket");

    let case = TestCase::builder("gcs_bucket_plan", &module)
        .project("test-project-12345")
        .var("bucket_name", "test-bucket")
        .build()
        .expect("case");
    let ctx = fixture.harness.prepare(&case).expect("prepare");
    let validate = fixture.harness.validate(&ctx).expect("validate");
    assert!(!validate.trim().is_empty());
    let plan = fixture.harness.plan(&ctx).expect("plan");
    assert!(plan.contains("google_storage_bucket"), "plan output: {plan}");

    let negative = TestCase::builder("gcs_bucket_invalid_name", &module)
        .project(&fixture.project_id)
        .var("bucket_name", "Invalid_Bucket")
        .expect_error("*Invalid bucket name*")
        .build()
        .expect("case");
    let report = fixture.run_recorded("gcs_bucket_invalid_name", &negative, |_| Ok(())).expect("negative case");
    assert_eq!(report.outcome, CaseOutcome::ExpectedFailure);
    assert!(report.reached(CasePhase::FailedBeforeApply));
    assert!(!report.reached(CasePhase::Applied));
}
