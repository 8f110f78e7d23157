// system-tests/tests/suites/gcs_bucket.rs
// ============================================================================
// Module: GCS Bucket Suite
// Description: Provisions buckets with default and custom settings.
// Purpose: Confirm bucket outputs and provider-side existence.
// Dependencies: system-tests helpers, infra-probe-core
// ============================================================================

//! ## Overview
//! Both cases apply a real bucket, check its outputs, confirm it exists
//! through the Storage API, and destroy it.

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
fn default_bucket_applies_and_reports_outputs() {
    let fixture = Fixture::load().expect("fixture");
    let case = TestCase::builder("gcs_bucket_default", fixture.module("gcs-bucket-root"))
        .project(&fixture.project_id)
        .bucket_name("bucket_name", format!("test-bucket-{}", fixture.project_id))
        .output_non_empty("bucket_name")
        .output_non_empty("bucket_url")
        .output_passthrough("bucket_name", "bucket_name")
        .verify_resource(ResourceKind::StorageBucket, "bucket_name")
        .retry(fixture.retry.clone())
        .build()
        .expect("case");

    let report = fixture
        .run_recorded("gcs_bucket_default", &case, |applied| {
            let url = applied.output("bucket_url").unwrap_or_default();
            if url.starts_with("gs://") {
                Ok(())
            } else {
                Err(format!("bucket_url `{url}` is not a gs:// url"))
            }
        })
        .expect("default bucket case");
    assert_eq!(report.outcome, CaseOutcome::Passed);
}

#[test]
fn custom_bucket_settings_are_applied() {
    let fixture = Fixture::load().expect("fixture");
    let case = TestCase::builder("gcs_bucket_custom", fixture.module("gcs-bucket"))
        .project(&fixture.project_id)
        .bucket_name("bucket_name", "test-bucket-custom")
        .var("location", "EU")
        .var("storage_class", "NEARLINE")
        .var("versioning_enabled", false)
        .var("lifecycle_age_days", 60)
        .output_non_empty("bucket_name")
        .output_equals("location", "EU")
        .output_equals("storage_class", "NEARLINE")
        .verify_resource(ResourceKind::StorageBucket, "bucket_name")
        .retry(fixture.retry.clone())
        .build()
        .expect("case");

    let report = fixture.run_recorded("gcs_bucket_custom", &case, |_| Ok(())).expect("custom bucket case");
    assert_eq!(report.outcome, CaseOutcome::Passed);
    assert!(report.unique_names["bucket_name"].starts_with("test-bucket-custom-"));
}
