//! A join is never issued against an empty population.

use ent_reconcile::{run_pipeline, PipelineOptions};
use ent_testkit::{ts, MemoryGateway, Tables, ACME_ID};

#[tokio::test]
async fn no_unlinked_learners_means_no_transactional_queries() {
    let mut t = Tables::default();
    t.add_linked_analytics_row(1, ACME_ID, "C1", Some(true));
    let gw = MemoryGateway::new(t);

    let r = run_pipeline(&gw, &PipelineOptions::default()).await.unwrap();
    assert!(r.unmatched_in_analytics.is_empty());
    assert!(r.learners.is_empty());

    let calls = gw.calls();
    assert!(calls.iter().all(|c| !c.is_keyed()), "calls: {calls:?}");
    // S0 + S6 declined + S6 missing
    assert_eq!(calls.len(), 3);
}

#[tokio::test]
async fn everyone_resolved_stops_after_linkage_lookup() {
    let mut t = Tables::default();
    t.add_unlinked_learner(5, "eve", ACME_ID, "Acme", ts(2018, 1, 1))
        .add_customer_user(50, 5, ACME_ID, ts(2020, 1, 1))
        .add_course_link(50, "C5", ts(2020, 2, 1));
    let gw = MemoryGateway::new(t);

    let r = run_pipeline(&gw, &PipelineOptions::default()).await.unwrap();
    assert_eq!(r.resolved_elsewhere.len(), 1);
    assert!(r.unresolved.is_empty());
    assert!(r.with_platform_enrollment.is_empty());

    assert_eq!(gw.calls_named("enterprise_course_enrollments").len(), 1);
    for skipped in [
        "course_enrollments",
        "enterprise_customer_users",
        "account_creation",
        "consent_records",
    ] {
        assert!(gw.calls_named(skipped).is_empty(), "{skipped} was issued");
    }
}
