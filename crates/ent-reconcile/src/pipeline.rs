//! Reconciliation pipeline.
//!
//! Stages run strictly forward; each keyed stage is issued only for the
//! population derived by the stage before it:
//!
//! | Stage | Store         | Population in      | Population out                       |
//! |-------|---------------|--------------------|--------------------------------------|
//! | S0    | analytics     | (scope)            | `P0` unmatched in analytics          |
//! | S1    | transactional | `P0`               | resolved elsewhere, `P1 = P0 - resolved` |
//! | S2    | transactional | `P1`               | `P2` with platform enrollment         |
//! | S3    | transactional | `P2`               | deliverable [`EnterpriseLearner`]s    |
//! | S4    | transactional | `P2`               | account-age split (diagnostic)        |
//! | S5    | transactional | `P2`               | consent audit (diagnostic)            |
//! | S6    | analytics     | (scope)            | declined / missing consent counts     |
//!
//! Join results are intersected with the population they were requested for,
//! so `P2 ⊆ P1 ⊆ P0` holds even if a store over-returns.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};

use crate::intent::fetch;
use crate::{
    columns, group_by_user, ConsentFilter, CustomerScope, EnterpriseLearner, Gateway, Population,
    QueryIntent, Record, RecordError, StoreError, UserKey,
};

/// Keys per keyed query.
pub const DEFAULT_KEY_BATCH_SIZE: usize = 500;

/// `(year, month, day)` at midnight. Platform accounts created on or after
/// it are presumed to have been created through the enterprise relationship.
pub const ENTERPRISE_CUTOFF_DATE: (i32, u32, u32) = (2017, 5, 1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountAge {
    PreCutoff,
    PostCutoff,
}

/// Inclusive boundary: joined exactly at the cutoff is post-cutoff.
pub fn classify_account_age(date_joined: NaiveDateTime) -> AccountAge {
    let d = date_joined.date();
    if (d.year(), d.month(), d.day()) >= ENTERPRISE_CUTOFF_DATE {
        AccountAge::PostCutoff
    } else {
        AccountAge::PreCutoff
    }
}

// ---------------------------------------------------------------------------
// Options / errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOptions {
    pub scope: CustomerScope,
    pub key_batch_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            scope: CustomerScope::All,
            key_batch_size: DEFAULT_KEY_BATCH_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    Store(StoreError),
    Record(RecordError),
    /// `key_batch_size` must be at least 1.
    InvalidBatchSize,
    /// A learner reached S3 without an analytics identity row.
    MissingIdentity { user_key: UserKey },
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{e}"),
            Self::Record(e) => write!(f, "malformed record: {e}"),
            Self::InvalidBatchSize => write!(f, "key_batch_size must be > 0"),
            Self::MissingIdentity { user_key } => {
                write!(f, "learner '{user_key}' has no analytics identity record")
            }
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Record(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ReconcileError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<RecordError> for ReconcileError {
    fn from(e: RecordError) -> Self {
        Self::Record(e)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccountAgeSplit {
    pub pre_cutoff: usize,
    pub post_cutoff: usize,
}

/// Learners by the state of their most recent consent record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConsentDecisions {
    pub granted: usize,
    pub declined: usize,
    pub undecided: usize,
}

impl ConsentDecisions {
    fn count(&mut self, latest: Option<bool>) {
        match latest {
            Some(true) => self.granted += 1,
            Some(false) => self.declined += 1,
            None => self.undecided += 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConsentAudit {
    /// Learners in `P2` with at least one consent record.
    pub learners_with_consent: usize,
    pub decisions: ConsentDecisions,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConsentEnrollmentCounts {
    pub declined: usize,
    pub missing: usize,
}

/// Everything one run found. Populations are kept by name so the operator can
/// see who dropped out where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scope: CustomerScope,
    /// `P0`
    pub unmatched_in_analytics: Population,
    pub resolved_elsewhere: Population,
    /// Linkage rows that resolved learners, for the diagnostic dump.
    pub resolved_records: Vec<Record>,
    /// `P1`
    pub unresolved: Population,
    /// `P2`
    pub with_platform_enrollment: Population,
    /// `P1 - P2`: no platform enrollment at all; reported, not investigated.
    pub without_platform_enrollment: Population,
    pub with_enterprise_customer_user: Population,
    pub without_enterprise_customer_user: Population,
    pub learners: BTreeMap<UserKey, EnterpriseLearner>,
    pub course_enrollment_count: usize,
    pub account_age: AccountAgeSplit,
    pub consent_audit: ConsentAudit,
    pub consent_enrollments: ConsentEnrollmentCounts,
}

impl ReconcileReport {
    pub fn populations(&self) -> [&Population; 7] {
        [
            &self.unmatched_in_analytics,
            &self.resolved_elsewhere,
            &self.unresolved,
            &self.with_platform_enrollment,
            &self.without_platform_enrollment,
            &self.with_enterprise_customer_user,
            &self.without_enterprise_customer_user,
        ]
    }

    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary {
            scope: self.scope.to_string(),
            unmatched_in_analytics: self.unmatched_in_analytics.len(),
            resolved_elsewhere: self.resolved_elsewhere.len(),
            resolved_enrollment_records: self.resolved_records.len(),
            unresolved: self.unresolved.len(),
            with_platform_enrollment: self.with_platform_enrollment.len(),
            without_platform_enrollment: self.without_platform_enrollment.len(),
            enterprise_learners: self.learners.len(),
            without_enterprise_customer_user: self.without_enterprise_customer_user.len(),
            course_enrollments: self.course_enrollment_count,
            account_age: self.account_age,
            consent_audit: self.consent_audit,
            consent_enrollments: self.consent_enrollments,
        }
    }
}

/// Counts only; logged at the end of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub scope: String,
    pub unmatched_in_analytics: usize,
    pub resolved_elsewhere: usize,
    pub resolved_enrollment_records: usize,
    pub unresolved: usize,
    pub with_platform_enrollment: usize,
    pub without_platform_enrollment: usize,
    pub enterprise_learners: usize,
    pub without_enterprise_customer_user: usize,
    pub course_enrollments: usize,
    pub account_age: AccountAgeSplit,
    pub consent_audit: ConsentAudit,
    pub consent_enrollments: ConsentEnrollmentCounts,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Issue a keyed intent for every member of `population`, in batches.
///
/// An empty population issues nothing: a join against an empty key list is
/// never sent to a store.
async fn fetch_keyed<F>(
    gateway: &dyn Gateway,
    population: &Population,
    batch_size: usize,
    intent_for: F,
) -> Result<Vec<Record>, StoreError>
where
    F: Fn(Vec<UserKey>) -> QueryIntent,
{
    let mut out = Vec::new();
    if population.is_empty() {
        debug!(population = population.name(), "empty population, join skipped");
        return Ok(out);
    }
    let keys = population.to_vec();
    for batch in keys.chunks(batch_size) {
        let intent = intent_for(batch.to_vec());
        let rows = fetch(gateway, &intent).await?;
        debug!(
            intent = intent.name(),
            keys = batch.len(),
            rows = rows.len(),
            "batch fetched"
        );
        out.extend(rows);
    }
    Ok(out)
}

fn log_record(label: &str, record: &Record) {
    for (column, value) in record.iter() {
        debug!(label, column, value = %value);
    }
}

/// Run S0..S6 against one point-in-time snapshot of both stores.
pub async fn run_pipeline(
    gateway: &dyn Gateway,
    opts: &PipelineOptions,
) -> Result<ReconcileReport, ReconcileError> {
    if opts.key_batch_size == 0 {
        return Err(ReconcileError::InvalidBatchSize);
    }
    let scope = &opts.scope;
    let batch = opts.key_batch_size;

    // S0: enterprise learners the warehouse has no enterprise enrollment for.
    let a0 = group_by_user(
        fetch(
            gateway,
            &QueryIntent::UnlinkedEnterpriseEnrollments {
                scope: scope.clone(),
            },
        )
        .await?,
        columns::LMS_USER_ID,
    )?;
    let p0 = a0.population("unmatched_in_analytics");
    info!(
        learners = p0.len(),
        scope = %scope,
        "enterprise learners without enterprise course enrollment"
    );

    // S1: which of those the LMS actually has linkage rows for.
    let linkage = fetch_keyed(gateway, &p0, batch, |keys| {
        QueryIntent::EnterpriseCourseEnrollments {
            keys,
            scope: scope.clone(),
        }
    })
    .await?;
    let linked = group_by_user(linkage, columns::LMS_USER_ID)?.restrict_to(&p0);
    let resolved = linked.population("resolved_elsewhere");
    let mut resolved_records = Vec::with_capacity(linked.record_count());
    for (key, records) in linked.iter() {
        for record in records {
            log_record("linkage", record);
            resolved_records.push(record.clone());
        }
        for record in a0.get(key).unwrap_or_default() {
            log_record("analytics", record);
        }
    }
    info!(
        learners = resolved.len(),
        records = resolved_records.len(),
        "actually have enterprise course enrollment records"
    );

    let p1 = p0.difference(&resolved, "unresolved");
    info!(
        learners = p1.len(),
        "enterprise learners still without enterprise course enrollment"
    );

    // S2: platform course enrollments.
    let c2 = group_by_user(
        fetch_keyed(gateway, &p1, batch, |keys| QueryIntent::CourseEnrollments {
            keys,
        })
        .await?,
        columns::LMS_USER_ID,
    )?
    .restrict_to(&p1);
    let p2 = c2.population("with_platform_enrollment");
    let without_enrollment = p1.difference(&p2, "without_platform_enrollment");
    info!(
        learners = p2.len(),
        "without enterprise course enrollment but with course enrollment"
    );
    info!(
        learners = without_enrollment.len(),
        "enterprise learners with no enrollments"
    );

    // S3: enterprise-customer-user join -> deliverable learners.
    let ecu = group_by_user(
        fetch_keyed(gateway, &p2, batch, |keys| {
            QueryIntent::EnterpriseCustomerUsers {
                keys,
                scope: scope.clone(),
            }
        })
        .await?,
        columns::USER_ID,
    )?
    .restrict_to(&p2);

    let mut learners = BTreeMap::new();
    for (key, ecu_records) in ecu.iter() {
        // Earliest relationship wins when a learner has several.
        let Some(ecu_record) = ecu_records.first() else {
            continue;
        };
        let identity = a0
            .first(key)
            .ok_or_else(|| ReconcileError::MissingIdentity {
                user_key: key.clone(),
            })?;
        let enrollments = c2.get(key).unwrap_or_default();
        let learner = EnterpriseLearner::from_correlated(key.clone(), identity, ecu_record, enrollments)?;
        learners.insert(key.clone(), learner);
    }
    let with_ecu = Population::new("with_enterprise_customer_user", learners.keys().cloned());
    let without_ecu = p2.difference(&with_ecu, "without_enterprise_customer_user");
    let course_enrollment_count = learners.values().map(|l| l.enrollments().len()).sum();
    info!(
        learners = learners.len(),
        "enterprise learners with missing enterprise course enrollments"
    );
    info!(
        enrollments = course_enrollment_count,
        "course enrollments with missing enterprise course enrollments"
    );

    // S4: when were those accounts created?
    let accounts = group_by_user(
        fetch_keyed(gateway, &p2, batch, |keys| QueryIntent::AccountCreation {
            keys,
        })
        .await?,
        columns::LMS_USER_ID,
    )?
    .restrict_to(&p2);
    let mut account_age = AccountAgeSplit::default();
    for (_, records) in accounts.iter() {
        for record in records {
            match classify_account_age(record.timestamp(columns::DATE_JOINED)?) {
                AccountAge::PreCutoff => account_age.pre_cutoff += 1,
                AccountAge::PostCutoff => account_age.post_cutoff += 1,
            }
        }
    }
    info!(accounts = account_age.pre_cutoff, "existing user accounts");
    info!(accounts = account_age.post_cutoff, "enterprise accounts");

    // S5: consent decisions on file.
    let consent = group_by_user(
        fetch_keyed(gateway, &p2, batch, |keys| QueryIntent::ConsentRecords {
            keys,
        })
        .await?,
        columns::LMS_USER_ID,
    )?
    .restrict_to(&p2);
    let mut decisions = ConsentDecisions::default();
    for (_, records) in consent.iter() {
        for record in records {
            log_record("consent", record);
        }
        // Records arrive oldest first.
        if let Some(latest) = records.last() {
            decisions.count(latest.flag(columns::GRANTED)?);
        }
    }
    let consent_audit = ConsentAudit {
        learners_with_consent: consent.len(),
        decisions,
    };
    info!(
        learners = consent_audit.learners_with_consent,
        granted = decisions.granted,
        declined = decisions.declined,
        undecided = decisions.undecided,
        "learners with a course enrollment and no enterprise enrollment have a consent record"
    );

    // S6: linked enrollments with declined / missing consent.
    let declined = fetch(
        gateway,
        &QueryIntent::ConsentEnrollments {
            scope: scope.clone(),
            consent: ConsentFilter::Declined,
        },
    )
    .await?
    .len();
    info!(enrollments = declined, "enterprise course enrollments with declined consent");

    let missing = fetch(
        gateway,
        &QueryIntent::ConsentEnrollments {
            scope: scope.clone(),
            consent: ConsentFilter::Missing,
        },
    )
    .await?
    .len();
    info!(enrollments = missing, "enterprise course enrollments with null consent");

    Ok(ReconcileReport {
        scope: scope.clone(),
        unmatched_in_analytics: p0,
        resolved_elsewhere: resolved,
        resolved_records,
        unresolved: p1,
        with_platform_enrollment: p2,
        without_platform_enrollment: without_enrollment,
        with_enterprise_customer_user: with_ecu,
        without_enterprise_customer_user: without_ecu,
        learners,
        course_enrollment_count,
        account_age,
        consent_audit,
        consent_enrollments: ConsentEnrollmentCounts { declined, missing },
    })
}
