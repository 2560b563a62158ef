//! In-memory stand-in for both stores.
//!
//! Tables are typed rows; each intent is answered with the same joins,
//! filters, ordering and column aliases the SQL gateway renders. No network,
//! no randomness.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use ent_reconcile::{
    ConsentFilter, CustomerScope, Gateway, QueryIntent, Record, StoreError, StoreKind, UserKey,
};

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// `business_intelligence.enterprise_enrollment`
#[derive(Clone, Debug)]
pub struct AnalyticsEnrollment {
    pub lms_user_id: Option<i64>,
    pub user_username: Option<String>,
    pub enterprise_id: String,
    pub enterprise_name: String,
    pub course_id: Option<String>,
    pub consent_granted: Option<bool>,
}

/// `auth_user`
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub date_joined: NaiveDateTime,
}

/// `student_courseenrollment`
#[derive(Clone, Debug)]
pub struct PlatformEnrollment {
    pub user_id: i64,
    pub course_id: String,
    pub created: NaiveDateTime,
    pub is_active: bool,
    pub mode: String,
}

/// `enterprise_enterprisecustomeruser`
#[derive(Clone, Debug)]
pub struct CustomerUser {
    pub id: i64,
    pub user_id: i64,
    pub enterprise_customer_id: String,
    pub created: NaiveDateTime,
}

/// `enterprise_enterprisecourseenrollment`
#[derive(Clone, Debug)]
pub struct CourseLink {
    pub enterprise_customer_user_id: i64,
    pub course_id: String,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
}

/// `consent_datasharingconsent`
#[derive(Clone, Debug)]
pub struct ConsentRow {
    pub username: String,
    pub course_id: String,
    pub granted: Option<bool>,
    pub created: NaiveDateTime,
}

#[derive(Clone, Debug, Default)]
pub struct Tables {
    pub analytics_enrollments: Vec<AnalyticsEnrollment>,
    pub auth_users: Vec<AuthUser>,
    pub platform_enrollments: Vec<PlatformEnrollment>,
    pub customer_users: Vec<CustomerUser>,
    pub course_links: Vec<CourseLink>,
    pub consents: Vec<ConsentRow>,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct MemoryGateway {
    tables: Tables,
    calls: Mutex<Vec<QueryIntent>>,
    fail_on: Option<&'static str>,
}

/// Warehouse side: `LOWER(REPLACE(CAST(enterprise_id AS VARCHAR), '-', '')) = $1`.
fn analytics_in_scope(scope: &CustomerScope, enterprise_id: &str) -> bool {
    scope.customer_id().map_or(true, |c| {
        enterprise_id.replace('-', "").to_lowercase() == c.simple().to_string()
    })
}

/// LMS side: plain equality against the char(32) column.
fn lms_in_scope(scope: &CustomerScope, enterprise_customer_id: &str) -> bool {
    scope
        .customer_id()
        .map_or(true, |c| enterprise_customer_id == c.simple().to_string())
}

fn keyed(keys: &[UserKey], id: i64) -> bool {
    keys.contains(&UserKey::from_raw(id))
}

impl MemoryGateway {
    pub fn new(tables: Tables) -> Self {
        Self {
            tables,
            calls: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Fail every intent whose [`QueryIntent::name`] equals `intent_name`.
    pub fn failing_on(mut self, intent_name: &'static str) -> Self {
        self.fail_on = Some(intent_name);
        self
    }

    /// Every intent received, in order.
    pub fn calls(&self) -> Vec<QueryIntent> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn calls_named(&self, intent_name: &str) -> Vec<QueryIntent> {
        self.calls()
            .into_iter()
            .filter(|i| i.name() == intent_name)
            .collect()
    }

    fn record_call(&self, intent: &QueryIntent) -> Result<(), StoreError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(intent.clone());
        if self.fail_on == Some(intent.name()) {
            return Err(StoreError::Query {
                store: intent.store(),
                message: format!("injected failure on {}", intent.name()),
            });
        }
        if intent.is_keyed() && intent.keys().is_empty() {
            return Err(StoreError::Query {
                store: intent.store(),
                message: format!("{}: IN () with no keys", intent.name()),
            });
        }
        Ok(())
    }

    fn analytics_row(row: &AnalyticsEnrollment) -> Record {
        Record::new()
            .with("lms_user_id", row.lms_user_id)
            .with("user_username", row.user_username.clone())
            .with("enterprise_id", row.enterprise_id.as_str())
            .with("enterprise_name", row.enterprise_name.as_str())
            .with("course_id", row.course_id.clone())
            .with("consent_granted", row.consent_granted)
    }

    fn answer_analytics(&self, intent: &QueryIntent) -> Vec<Record> {
        let t = &self.tables;
        let mut rows: Vec<&AnalyticsEnrollment> = match intent {
            QueryIntent::UnlinkedEnterpriseEnrollments { scope } => t
                .analytics_enrollments
                .iter()
                .filter(|r| r.lms_user_id.is_some() && r.course_id.is_none())
                .filter(|r| analytics_in_scope(scope, &r.enterprise_id))
                .collect(),
            QueryIntent::ConsentEnrollments { scope, consent } => t
                .analytics_enrollments
                .iter()
                .filter(|r| r.course_id.is_some())
                .filter(|r| match consent {
                    ConsentFilter::Declined => r.consent_granted == Some(false),
                    ConsentFilter::Missing => r.consent_granted.is_none(),
                })
                .filter(|r| analytics_in_scope(scope, &r.enterprise_id))
                .collect(),
            _ => Vec::new(),
        };
        rows.sort_by_key(|r| r.lms_user_id);
        rows.into_iter().map(Self::analytics_row).collect()
    }

    fn answer_transactional(&self, intent: &QueryIntent) -> Vec<Record> {
        let t = &self.tables;
        match intent {
            QueryIntent::EnterpriseCourseEnrollments { keys, scope } => {
                let mut out = Vec::new();
                let mut users: Vec<&AuthUser> =
                    t.auth_users.iter().filter(|u| keyed(keys, u.id)).collect();
                users.sort_by_key(|u| u.id);
                for user in users {
                    let mut links: Vec<&CourseLink> = t
                        .customer_users
                        .iter()
                        .filter(|ecu| ecu.user_id == user.id)
                        .filter(|ecu| lms_in_scope(scope, &ecu.enterprise_customer_id))
                        .flat_map(|ecu| {
                            t.course_links
                                .iter()
                                .filter(move |l| l.enterprise_customer_user_id == ecu.id)
                        })
                        .collect();
                    links.sort_by_key(|l| l.created);
                    out.extend(links.into_iter().map(|l| {
                        Record::new()
                            .with("created", l.created)
                            .with("modified", l.modified)
                            .with("course_id", l.course_id.as_str())
                            .with("lms_user_id", user.id)
                    }));
                }
                out
            }
            QueryIntent::CourseEnrollments { keys } => {
                let mut rows: Vec<&PlatformEnrollment> = t
                    .platform_enrollments
                    .iter()
                    .filter(|e| keyed(keys, e.user_id))
                    .collect();
                rows.sort_by_key(|e| (e.user_id, e.created));
                rows.into_iter()
                    .map(|e| {
                        Record::new()
                            .with("lms_user_id", e.user_id)
                            .with("course_id", e.course_id.as_str())
                            .with("created", e.created)
                            .with("is_active", e.is_active)
                            .with("mode", e.mode.as_str())
                    })
                    .collect()
            }
            QueryIntent::EnterpriseCustomerUsers { keys, scope } => {
                let mut rows: Vec<&CustomerUser> = t
                    .customer_users
                    .iter()
                    .filter(|ecu| keyed(keys, ecu.user_id))
                    .filter(|ecu| lms_in_scope(scope, &ecu.enterprise_customer_id))
                    .collect();
                rows.sort_by_key(|ecu| (ecu.user_id, ecu.created, ecu.id));
                rows.into_iter()
                    .map(|ecu| {
                        Record::new()
                            .with("user_id", ecu.user_id)
                            .with("enterprise_customer_id", ecu.enterprise_customer_id.as_str())
                            .with("created", ecu.created)
                    })
                    .collect()
            }
            QueryIntent::AccountCreation { keys } => {
                let mut rows: Vec<&AuthUser> =
                    t.auth_users.iter().filter(|u| keyed(keys, u.id)).collect();
                rows.sort_by_key(|u| u.id);
                rows.into_iter()
                    .map(|u| {
                        Record::new()
                            .with("lms_user_id", u.id)
                            .with("date_joined", u.date_joined)
                    })
                    .collect()
            }
            QueryIntent::ConsentRecords { keys } => {
                let mut out = Vec::new();
                let mut users: Vec<&AuthUser> =
                    t.auth_users.iter().filter(|u| keyed(keys, u.id)).collect();
                users.sort_by_key(|u| u.id);
                for user in users {
                    let mut rows: Vec<&ConsentRow> = t
                        .consents
                        .iter()
                        .filter(|c| c.username == user.username)
                        .collect();
                    rows.sort_by_key(|c| c.created);
                    out.extend(rows.into_iter().map(|c| {
                        Record::new()
                            .with("lms_user_id", user.id)
                            .with("course_id", c.course_id.as_str())
                            .with("granted", c.granted)
                            .with("created", c.created)
                    }));
                }
                out
            }
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn fetch_analytics(&self, intent: &QueryIntent) -> Result<Vec<Record>, StoreError> {
        self.record_call(intent)?;
        if intent.store() != StoreKind::Analytics {
            return Err(StoreError::WrongStore {
                store: StoreKind::Analytics,
                intent: intent.name(),
            });
        }
        Ok(self.answer_analytics(intent))
    }

    async fn fetch_transactional(&self, intent: &QueryIntent) -> Result<Vec<Record>, StoreError> {
        self.record_call(intent)?;
        if intent.store() != StoreKind::Transactional {
            return Err(StoreError::WrongStore {
                store: StoreKind::Transactional,
                intent: intent.name(),
            });
        }
        Ok(self.answer_transactional(intent))
    }
}
