//! S4..S6 diagnostics: account age split at 2017-05-01, consent audit by
//! each learner's latest decision, and linked enrollments with declined /
//! missing consent.

use chrono::NaiveDate;
use ent_reconcile::{run_pipeline, AccountAgeSplit, ConsentEnrollmentCounts, PipelineOptions};
use ent_testkit::{ts, MemoryGateway, Tables, ACME_ID};

#[tokio::test]
async fn diagnostics_count_what_the_stores_hold() {
    let last_second_before_cutoff = NaiveDate::from_ymd_opt(2017, 4, 30)
        .unwrap()
        .and_hms_opt(23, 59, 59)
        .unwrap();

    let mut t = Tables::default();
    t.add_unlinked_learner(1, "old", ACME_ID, "Acme", last_second_before_cutoff)
        .add_unlinked_learner(2, "new", ACME_ID, "Acme", ts(2017, 5, 1))
        .add_unlinked_learner(3, "mid", ACME_ID, "Acme", ts(2018, 2, 1))
        .add_enrollment(1, "C1", ts(2020, 1, 1))
        .add_enrollment(2, "C2", ts(2020, 1, 1))
        .add_enrollment(3, "C3", ts(2020, 1, 1))
        .add_consent("old", "C1", Some(true), ts(2020, 1, 2))
        // Undecided first, declined later: the learner counts once, as declined.
        .add_consent("new", "C2", None, ts(2020, 1, 2))
        .add_consent("new", "C9", Some(false), ts(2020, 1, 3))
        .add_consent("mid", "C3", None, ts(2020, 1, 4))
        .add_consent("stranger", "C2", Some(false), ts(2020, 1, 3))
        .add_linked_analytics_row(8, ACME_ID, "D1", Some(false))
        .add_linked_analytics_row(9, ACME_ID, "D2", Some(false))
        .add_linked_analytics_row(9, ACME_ID, "D3", None)
        .add_linked_analytics_row(9, ACME_ID, "D4", Some(true));
    let gw = MemoryGateway::new(t);

    let r = run_pipeline(&gw, &PipelineOptions::default()).await.unwrap();

    assert_eq!(
        r.account_age,
        AccountAgeSplit {
            pre_cutoff: 1,
            post_cutoff: 2
        }
    );
    assert_eq!(r.consent_audit.learners_with_consent, 3);
    assert_eq!(r.consent_audit.decisions.granted, 1);
    assert_eq!(r.consent_audit.decisions.declined, 1);
    assert_eq!(r.consent_audit.decisions.undecided, 1);
    assert_eq!(
        r.consent_enrollments,
        ConsentEnrollmentCounts {
            declined: 2,
            missing: 1
        }
    );
    // No ECU rows: nobody is deliverable, diagnostics still ran.
    assert!(r.learners.is_empty());
    assert_eq!(r.without_enterprise_customer_user.len(), 3);
}
