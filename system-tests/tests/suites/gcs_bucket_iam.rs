// system-tests/tests/suites/gcs_bucket_iam.rs
// ============================================================================
// Module: GCS Bucket IAM Suite
// Description: Grants a role on a fresh bucket.
// Purpose: Confirm the binding outputs pass inputs through.
// Dependencies: system-tests helpers, infra-probe-core
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use infra_probe_core::CaseOutcome;
use infra_probe_core::ResourceKind;
use infra_probe_core::TestCase;

use crate::helpers::harness::Fixture;

#[test]
fn bucket_iam_binding_passes_role_and_member_through() {
    let fixture = Fixture::load().expect("fixture");
    let case = TestCase::builder("gcs_bucket_iam", fixture.module("gcs-bucket-iam"))
        .project(&fixture.project_id)
        .bucket_name("bucket_name", "test-iam")
        .var("member", "user:test@example.com")
        .var("role", "roles/storage.objectViewer")
        .output_non_empty("iam_binding_id")
        .output_passthrough("role", "role")
        .output_passthrough("member", "member")
        .verify_resource(ResourceKind::StorageBucket, "bucket_name")
        .retry(fixture.retry.clone())
        .build()
        .expect("case");

    let report = fixture.run_recorded("gcs_bucket_iam", &case, |_| Ok(())).expect("iam case");
    assert_eq!(report.outcome, CaseOutcome::Passed);
    assert_eq!(report.outputs["role"], "roles/storage.objectViewer");
}
