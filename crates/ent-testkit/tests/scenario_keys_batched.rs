//! Keyed lookups are split into batches that together cover the population
//! exactly once.

use std::collections::BTreeSet;

use ent_reconcile::{run_pipeline, CustomerScope, PipelineOptions};
use ent_testkit::{ts, MemoryGateway, Tables, ACME_ID};

#[tokio::test]
async fn seven_keys_in_batches_of_three() {
    let mut t = Tables::default();
    for id in 1..=7 {
        t.add_unlinked_learner(id, &format!("u{id}"), ACME_ID, "Acme", ts(2018, 1, 1))
            .add_customer_user(100 + id, id, ACME_ID, ts(2020, 1, 1))
            .add_enrollment(id, "C", ts(2020, 2, 1));
    }
    let gw = MemoryGateway::new(t);
    let opts = PipelineOptions {
        scope: CustomerScope::All,
        key_batch_size: 3,
    };
    let r = run_pipeline(&gw, &opts).await.unwrap();
    assert_eq!(r.learners.len(), 7);

    for stage in [
        "enterprise_course_enrollments",
        "course_enrollments",
        "enterprise_customer_users",
        "account_creation",
        "consent_records",
    ] {
        let calls = gw.calls_named(stage);
        let sizes: Vec<usize> = calls.iter().map(|c| c.keys().len()).collect();
        assert_eq!(sizes, vec![3, 3, 1], "{stage}");

        let covered: BTreeSet<String> = calls
            .iter()
            .flat_map(|c| c.keys().iter().map(|k| k.to_string()))
            .collect();
        assert_eq!(covered.len(), 7, "{stage}");
    }
}
