// SQL rendering for every QueryIntent.
//
// The pipeline never sees query text. Each intent renders to exactly one
// statement plus its positional binds. Learner keys are always bound, never
// spliced into the statement.

use std::fmt;

use ent_reconcile::{ConsentFilter, CustomerScope, QueryIntent, StoreError, StoreKind, UserKey};

/// Analytics fact table: one row per enterprise learner per enrollment.
pub const ENTERPRISE_ENROLLMENT_TABLE: &str = "business_intelligence.enterprise_enrollment";

const ANALYTICS_COLUMNS: &str = "\
    enterprise_user_id, \
    lms_user_id, \
    enterprise_sso_uid, \
    enterprise_id, \
    enterprise_name, \
    enrollment_created_timestamp, \
    consent_granted, \
    course_id, \
    user_account_creation_date, \
    user_email, \
    user_username, \
    user_current_enrollment_mode";

/// One rendered statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub sql: String,
    /// Positional binds in placeholder order.
    pub binds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A keyed intent arrived with no keys. `IN ()` is never sent.
    EmptyKeySet { intent: &'static str },
    WrongStore {
        store: StoreKind,
        intent: &'static str,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKeySet { intent } => {
                write!(f, "intent '{intent}' rendered with an empty key set")
            }
            Self::WrongStore { store, intent } => {
                write!(f, "intent '{intent}' has no {store} rendering")
            }
        }
    }
}

impl std::error::Error for RenderError {}

impl From<RenderError> for StoreError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::WrongStore { store, intent } => StoreError::WrongStore { store, intent },
            RenderError::EmptyKeySet { .. } => StoreError::Query {
                store: StoreKind::Transactional,
                message: e.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Analytics (PostgreSQL wire protocol, `$n` placeholders)
// ---------------------------------------------------------------------------

pub fn render_analytics(intent: &QueryIntent) -> Result<SqlQuery, RenderError> {
    let (mut predicates, scope) = match intent {
        QueryIntent::UnlinkedEnterpriseEnrollments { scope } => (
            vec!["lms_user_id IS NOT NULL", "course_id IS NULL"],
            scope,
        ),
        QueryIntent::ConsentEnrollments { scope, consent } => (
            vec![
                "course_id IS NOT NULL",
                match consent {
                    ConsentFilter::Declined => "consent_granted = false",
                    ConsentFilter::Missing => "consent_granted IS NULL",
                },
            ],
            scope,
        ),
        other => {
            return Err(RenderError::WrongStore {
                store: StoreKind::Analytics,
                intent: other.name(),
            })
        }
    };

    // Compared as 32 lowercase hex digits whether the column is uuid or text.
    let mut binds = Vec::new();
    if let Some(customer) = scope.customer_id() {
        predicates.push("LOWER(REPLACE(CAST(enterprise_id AS VARCHAR), '-', '')) = $1");
        binds.push(customer.simple().to_string());
    }

    let sql = format!(
        "SELECT {ANALYTICS_COLUMNS} FROM {ENTERPRISE_ENROLLMENT_TABLE} WHERE {} \
         ORDER BY lms_user_id, enrollment_created_timestamp",
        predicates.join(" AND ")
    );
    Ok(SqlQuery { sql, binds })
}

// ---------------------------------------------------------------------------
// Transactional (MySQL, `?` placeholders)
// ---------------------------------------------------------------------------

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn keyed(intent: &QueryIntent) -> Result<(String, Vec<String>), RenderError> {
    let keys = intent.keys();
    if keys.is_empty() {
        return Err(RenderError::EmptyKeySet {
            intent: intent.name(),
        });
    }
    Ok((
        placeholders(keys.len()),
        keys.iter().map(UserKey::to_string).collect(),
    ))
}

/// Django stores UUIDField on MySQL as char(32): bind the simple form.
fn scope_clause(scope: &CustomerScope, column: &str, binds: &mut Vec<String>) -> String {
    match scope.customer_id() {
        Some(customer) => {
            binds.push(customer.simple().to_string());
            format!(" AND {column} = ?")
        }
        None => String::new(),
    }
}

pub fn render_transactional(intent: &QueryIntent) -> Result<SqlQuery, RenderError> {
    if intent.store() != StoreKind::Transactional {
        return Err(RenderError::WrongStore {
            store: StoreKind::Transactional,
            intent: intent.name(),
        });
    }
    let (in_list, mut binds) = keyed(intent)?;

    let sql = match intent {
        QueryIntent::EnterpriseCourseEnrollments { scope, .. } => {
            let scoped = scope_clause(scope, "ecu.enterprise_customer_id", &mut binds);
            format!(
                "SELECT ece.created AS created, ece.modified AS modified, \
                 ece.course_id AS course_id, u.id AS lms_user_id \
                 FROM auth_user u \
                 JOIN enterprise_enterprisecustomeruser ecu ON ecu.user_id = u.id \
                 JOIN enterprise_enterprisecourseenrollment ece ON ece.enterprise_customer_user_id = ecu.id \
                 WHERE u.id IN ({in_list}){scoped} \
                 ORDER BY u.id, ece.created"
            )
        }
        QueryIntent::CourseEnrollments { .. } => format!(
            "SELECT user_id AS lms_user_id, course_id, created, is_active, mode \
             FROM student_courseenrollment \
             WHERE user_id IN ({in_list}) \
             ORDER BY user_id, created, id"
        ),
        QueryIntent::EnterpriseCustomerUsers { scope, .. } => {
            let scoped = scope_clause(scope, "enterprise_customer_id", &mut binds);
            format!(
                "SELECT user_id, enterprise_customer_id, created \
                 FROM enterprise_enterprisecustomeruser \
                 WHERE user_id IN ({in_list}){scoped} \
                 ORDER BY user_id, created ASC, id ASC"
            )
        }
        QueryIntent::AccountCreation { .. } => format!(
            "SELECT id AS lms_user_id, date_joined \
             FROM auth_user \
             WHERE id IN ({in_list}) \
             ORDER BY id"
        ),
        QueryIntent::ConsentRecords { .. } => format!(
            "SELECT u.id AS lms_user_id, dsc.course_id AS course_id, \
             dsc.granted AS granted, dsc.created AS created \
             FROM auth_user u \
             JOIN consent_datasharingconsent dsc ON dsc.username = u.username \
             WHERE u.id IN ({in_list}) \
             ORDER BY u.id, dsc.created"
        ),
        other => {
            return Err(RenderError::WrongStore {
                store: StoreKind::Transactional,
                intent: other.name(),
            })
        }
    };
    Ok(SqlQuery { sql, binds })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACME_HYPHENATED: &str = "8a8c6e2b-1f0e-4a1c-9a3e-0123456789ab";
    const ACME_SIMPLE: &str = "8a8c6e2b1f0e4a1c9a3e0123456789ab";

    fn keys(ids: &[i64]) -> Vec<UserKey> {
        ids.iter().map(|&n| UserKey::from_raw(n)).collect()
    }

    fn acme() -> CustomerScope {
        CustomerScope::from_option(Some(ACME_HYPHENATED.to_string())).unwrap()
    }

    #[test]
    fn unlinked_all_customers_has_no_binds() {
        let q = render_analytics(&QueryIntent::UnlinkedEnterpriseEnrollments {
            scope: CustomerScope::All,
        })
        .unwrap();
        assert!(q.sql.contains("lms_user_id IS NOT NULL AND course_id IS NULL"));
        assert!(!q.sql.contains("$1"));
        assert!(q.binds.is_empty());
    }

    #[test]
    fn customer_scope_adds_to_rather_than_replaces_filters() {
        let q = render_analytics(&QueryIntent::UnlinkedEnterpriseEnrollments {
            scope: acme(),
        })
        .unwrap();
        assert!(q.sql.contains(
            "lms_user_id IS NOT NULL AND course_id IS NULL AND \
             LOWER(REPLACE(CAST(enterprise_id AS VARCHAR), '-', '')) = $1"
        ));
        assert_eq!(q.binds, vec![ACME_SIMPLE.to_string()]);
    }

    #[test]
    fn scope_binds_the_same_hex_form_to_both_stores() {
        let scope = CustomerScope::from_option(Some(ACME_HYPHENATED.to_uppercase())).unwrap();
        let s0 = render_analytics(&QueryIntent::UnlinkedEnterpriseEnrollments {
            scope: scope.clone(),
        })
        .unwrap();
        let s1 = render_transactional(&QueryIntent::EnterpriseCourseEnrollments {
            keys: keys(&[7]),
            scope: scope.clone(),
        })
        .unwrap();
        let s3 = render_transactional(&QueryIntent::EnterpriseCustomerUsers {
            keys: keys(&[7]),
            scope,
        })
        .unwrap();

        assert_eq!(s0.binds, vec![ACME_SIMPLE.to_string()]);
        assert_eq!(s1.binds, vec!["7".to_string(), ACME_SIMPLE.to_string()]);
        assert_eq!(s3.binds, vec!["7".to_string(), ACME_SIMPLE.to_string()]);
    }

    #[test]
    fn consent_filters_render_distinct_predicates() {
        let declined = render_analytics(&QueryIntent::ConsentEnrollments {
            scope: CustomerScope::All,
            consent: ConsentFilter::Declined,
        })
        .unwrap();
        let missing = render_analytics(&QueryIntent::ConsentEnrollments {
            scope: CustomerScope::All,
            consent: ConsentFilter::Missing,
        })
        .unwrap();
        assert!(declined.sql.contains("consent_granted = false"));
        assert!(missing.sql.contains("consent_granted IS NULL"));
        assert!(declined.sql.contains("course_id IS NOT NULL"));
    }

    #[test]
    fn keys_are_bound_not_spliced() {
        let q = render_transactional(&QueryIntent::CourseEnrollments {
            keys: keys(&[7, 42]),
        })
        .unwrap();
        assert!(q.sql.contains("user_id IN (?, ?)"));
        assert!(!q.sql.contains("42"));
        assert_eq!(q.binds, vec!["7".to_string(), "42".to_string()]);
    }

    #[test]
    fn ecu_is_earliest_first_and_scope_bound_after_keys() {
        let q = render_transactional(&QueryIntent::EnterpriseCustomerUsers {
            keys: keys(&[1]),
            scope: acme(),
        })
        .unwrap();
        assert!(q.sql.contains("ORDER BY user_id, created ASC"));
        assert!(q.sql.contains("IN (?) AND enterprise_customer_id = ?"));
        assert_eq!(q.binds, vec!["1".to_string(), ACME_SIMPLE.to_string()]);
    }

    #[test]
    fn consent_records_join_on_username() {
        let q = render_transactional(&QueryIntent::ConsentRecords { keys: keys(&[3]) }).unwrap();
        assert!(q.sql.contains("dsc.username = u.username"));
    }

    #[test]
    fn empty_key_set_is_rejected() {
        let err = render_transactional(&QueryIntent::AccountCreation { keys: Vec::new() })
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::EmptyKeySet {
                intent: "account_creation"
            }
        );
    }

    #[test]
    fn wrong_store_is_rejected_both_ways() {
        let analytics = QueryIntent::UnlinkedEnterpriseEnrollments {
            scope: CustomerScope::All,
        };
        assert!(matches!(
            render_transactional(&analytics),
            Err(RenderError::WrongStore { .. })
        ));
        let transactional = QueryIntent::CourseEnrollments { keys: keys(&[1]) };
        assert!(matches!(
            render_analytics(&transactional),
            Err(RenderError::WrongStore { .. })
        ));
    }
}
