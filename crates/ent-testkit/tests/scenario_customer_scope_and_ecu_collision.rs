//! Customer scope narrows every scoped query; with several ECU records the
//! earliest one wins.

use ent_reconcile::{export_rows, run_pipeline, CustomerScope, PipelineOptions, QueryIntent, UserKey};
use ent_testkit::{ann_scenario, ts, MemoryGateway, Tables, ACME_ID, GLOBEX_ID};

#[tokio::test]
async fn scope_limits_population_and_is_carried_by_every_scoped_intent() {
    let mut t = ann_scenario(ts(2020, 1, 10));
    t.add_unlinked_learner(8, "bob", GLOBEX_ID, "Globex", ts(2019, 1, 1))
        .add_customer_user(80, 8, GLOBEX_ID, ts(2020, 1, 1))
        .add_enrollment(8, "G1", ts(2020, 2, 1));
    let gw = MemoryGateway::new(t);

    let opts = PipelineOptions {
        scope: CustomerScope::from_option(Some(ACME_ID.to_string())).unwrap(),
        ..PipelineOptions::default()
    };
    let r = run_pipeline(&gw, &opts).await.unwrap();

    assert_eq!(r.unmatched_in_analytics.len(), 1);
    assert!(r.learners.contains_key(&UserKey::from_raw(7)));
    assert!(!r.learners.contains_key(&UserKey::from_raw(8)));
    assert_eq!(r.summary().scope, ACME_ID);

    for call in gw.calls() {
        let scope = match &call {
            QueryIntent::UnlinkedEnterpriseEnrollments { scope }
            | QueryIntent::ConsentEnrollments { scope, .. }
            | QueryIntent::EnterpriseCourseEnrollments { scope, .. }
            | QueryIntent::EnterpriseCustomerUsers { scope, .. } => scope,
            _ => continue,
        };
        assert_eq!(scope, &opts.scope, "{} lost the scope", call.name());
    }
}

#[tokio::test]
async fn scoped_run_matches_ecu_stored_without_hyphens() {
    // Warehouse holds ACME_ID hyphenated, the LMS holds it as 32 hex digits.
    let t = ann_scenario(ts(2020, 1, 10));
    assert_eq!(
        t.customer_users[0].enterprise_customer_id,
        "8a8c6e2b1f0e4a1c9a3e0123456789ab"
    );
    let gw = MemoryGateway::new(t);

    for input in [
        ACME_ID,
        "8a8c6e2b1f0e4a1c9a3e0123456789ab",
        "8A8C6E2B-1F0E-4A1C-9A3E-0123456789AB",
    ] {
        let opts = PipelineOptions {
            scope: CustomerScope::from_option(Some(input.to_string())).unwrap(),
            ..PipelineOptions::default()
        };
        let r = run_pipeline(&gw, &opts).await.unwrap();
        assert_eq!(r.unmatched_in_analytics.len(), 1, "{input}");
        let ann = &r.learners[&UserKey::from_raw(7)];
        assert_eq!(ann.ecu_created(), ts(2020, 1, 5), "{input}");
        assert_eq!(export_rows(r.learners.values(), true).len(), 1, "{input}");
        assert_eq!(r.summary().scope, ACME_ID);
    }
}

#[tokio::test]
async fn earliest_ecu_record_wins() {
    let mut t = Tables::default();
    t.add_unlinked_learner(7, "ann", ACME_ID, "Acme", ts(2019, 1, 1))
        .add_customer_user(71, 7, GLOBEX_ID, ts(2021, 1, 1))
        .add_customer_user(70, 7, ACME_ID, ts(2020, 1, 5))
        .add_enrollment(7, "X101", ts(2020, 6, 1));
    let gw = MemoryGateway::new(t);

    let r = run_pipeline(&gw, &PipelineOptions::default()).await.unwrap();
    let ann = &r.learners[&UserKey::from_raw(7)];
    assert_eq!(ann.ecu_created(), ts(2020, 1, 5));
}
