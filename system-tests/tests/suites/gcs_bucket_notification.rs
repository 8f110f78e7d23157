// system-tests/tests/suites/gcs_bucket_notification.rs
// ============================================================================
// Module: GCS Bucket Notification Suite
// Description: Wires a bucket to a Pub/Sub topic.
// Purpose: Confirm both resources exist and share one generated suffix.
// Dependencies: system-tests helpers, infra-probe-core
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use infra_probe_core::CaseOutcome;
use infra_probe_core::NameKind;
use infra_probe_core::ResourceKind;
use infra_probe_core::TestCase;

use crate::helpers::harness::Fixture;

#[test]
fn bucket_notification_links_bucket_and_topic() {
    let fixture = Fixture::load().expect("fixture");
    let case = TestCase::builder("gcs_bucket_notification", fixture.module("gcs-bucket-notification"))
        .project(&fixture.project_id)
        .grouped_name("bucket_name", "test-notification", NameKind::Bucket, "notification")
        .grouped_name("topic_name", "test-topic", NameKind::Generic, "notification")
        .var("location", "US")
        .output_non_empty("notification_id")
        .verify_resource(ResourceKind::StorageBucket, "bucket_name")
        .verify_resource(ResourceKind::PubsubTopic, "topic_name")
        .retry(fixture.retry.clone())
        .build()
        .expect("case");

    let report = fixture
        .run_recorded("gcs_bucket_notification", &case, |applied| {
            let bucket = applied.var("bucket_name").unwrap_or_default();
            let topic = applied.var("topic_name").unwrap_or_default();
            if bucket.rsplit('-').next() == topic.rsplit('-').next() {
                Ok(())
            } else {
                Err(format!("`{bucket}` and `{topic}` do not share a suffix"))
            }
        })
        .expect("notification case");
    assert_eq!(report.outcome, CaseOutcome::Passed);
}
