//! Query intents and the store boundary.
//!
//! The pipeline asks for data by intent; it never builds query text. A
//! [`Gateway`] implementation (SQL in production, in-memory in tests) decides
//! how each intent is answered, and must honor exact key-match inclusion.

use std::fmt;

use uuid::Uuid;

use crate::{Record, UserKey};

/// Column names the pipeline reads from returned records.
pub mod columns {
    /// Learner id on analytics rows and on most transactional rows.
    pub const LMS_USER_ID: &str = "lms_user_id";
    /// Learner id on `enterprise_enterprisecustomeruser` rows.
    pub const USER_ID: &str = "user_id";
    pub const USER_USERNAME: &str = "user_username";
    pub const ENTERPRISE_ID: &str = "enterprise_id";
    pub const ENTERPRISE_NAME: &str = "enterprise_name";
    pub const CONSENT_GRANTED: &str = "consent_granted";
    pub const COURSE_ID: &str = "course_id";
    pub const CREATED: &str = "created";
    pub const MODIFIED: &str = "modified";
    pub const IS_ACTIVE: &str = "is_active";
    pub const MODE: &str = "mode";
    pub const DATE_JOINED: &str = "date_joined";
    pub const GRANTED: &str = "granted";
}

/// Which of the two stores answers an intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Analytics,
    Transactional,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Analytics => "analytics",
            StoreKind::Transactional => "transactional",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-supplied narrowing to one enterprise customer.
///
/// The id is held as a [`Uuid`]; each store compares it in its own textual
/// form (the warehouse hyphenated, the LMS as 32 hex digits).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CustomerScope {
    #[default]
    All,
    Customer(Uuid),
}

impl CustomerScope {
    /// Blank input means "all customers". Hyphenated, simple and braced
    /// UUID forms are accepted; anything else is an error.
    pub fn from_option(customer: Option<String>) -> Result<Self, uuid::Error> {
        match customer {
            Some(c) if !c.trim().is_empty() => {
                Ok(CustomerScope::Customer(Uuid::parse_str(c.trim())?))
            }
            _ => Ok(CustomerScope::All),
        }
    }

    pub fn customer_id(&self) -> Option<Uuid> {
        match self {
            CustomerScope::All => None,
            CustomerScope::Customer(id) => Some(*id),
        }
    }
}

impl fmt::Display for CustomerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerScope::All => f.write_str("all"),
            CustomerScope::Customer(id) => write!(f, "{}", id.hyphenated()),
        }
    }
}

/// Consent state selected by the declined/missing consent diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentFilter {
    /// `consent_granted` is false.
    Declined,
    /// `consent_granted` is null.
    Missing,
}

/// Everything the pipeline ever asks a store for.
///
/// Keyed intents carry at most one batch of keys; the pipeline never emits a
/// keyed intent with an empty key list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryIntent {
    /// Analytics: enterprise learners whose enrollment linkage (`course_id`) is null.
    UnlinkedEnterpriseEnrollments { scope: CustomerScope },
    /// Analytics: linked enterprise enrollments in a given consent state.
    ConsentEnrollments {
        scope: CustomerScope,
        consent: ConsentFilter,
    },
    /// Transactional: enterprise course enrollment linkage rows.
    EnterpriseCourseEnrollments {
        keys: Vec<UserKey>,
        scope: CustomerScope,
    },
    /// Transactional: platform course enrollments.
    CourseEnrollments { keys: Vec<UserKey> },
    /// Transactional: enterprise-customer-user rows, earliest first.
    EnterpriseCustomerUsers {
        keys: Vec<UserKey>,
        scope: CustomerScope,
    },
    /// Transactional: account creation (`date_joined`).
    AccountCreation { keys: Vec<UserKey> },
    /// Transactional: data sharing consent rows.
    ConsentRecords { keys: Vec<UserKey> },
}

impl QueryIntent {
    pub fn store(&self) -> StoreKind {
        match self {
            QueryIntent::UnlinkedEnterpriseEnrollments { .. }
            | QueryIntent::ConsentEnrollments { .. } => StoreKind::Analytics,
            _ => StoreKind::Transactional,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryIntent::UnlinkedEnterpriseEnrollments { .. } => "unlinked_enterprise_enrollments",
            QueryIntent::ConsentEnrollments {
                consent: ConsentFilter::Declined,
                ..
            } => "declined_consent_enrollments",
            QueryIntent::ConsentEnrollments {
                consent: ConsentFilter::Missing,
                ..
            } => "missing_consent_enrollments",
            QueryIntent::EnterpriseCourseEnrollments { .. } => "enterprise_course_enrollments",
            QueryIntent::CourseEnrollments { .. } => "course_enrollments",
            QueryIntent::EnterpriseCustomerUsers { .. } => "enterprise_customer_users",
            QueryIntent::AccountCreation { .. } => "account_creation",
            QueryIntent::ConsentRecords { .. } => "consent_records",
        }
    }

    /// Learner keys this intent is restricted to (empty for analytics intents).
    pub fn keys(&self) -> &[UserKey] {
        match self {
            QueryIntent::EnterpriseCourseEnrollments { keys, .. }
            | QueryIntent::CourseEnrollments { keys }
            | QueryIntent::EnterpriseCustomerUsers { keys, .. }
            | QueryIntent::AccountCreation { keys }
            | QueryIntent::ConsentRecords { keys } => keys.as_slice(),
            _ => &[],
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.store() == StoreKind::Transactional
    }

    /// Column of the returned records that carries the learner id.
    pub fn key_column(&self) -> &'static str {
        match self {
            QueryIntent::EnterpriseCustomerUsers { .. } => columns::USER_ID,
            _ => columns::LMS_USER_ID,
        }
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Every store failure is fatal to the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// Store unreachable or credentials rejected.
    Connection { store: StoreKind, message: String },
    /// The store rejected or failed the query.
    Query { store: StoreKind, message: String },
    /// A returned row could not be turned into a [`Record`].
    Decode { store: StoreKind, message: String },
    /// An intent was routed to the store that cannot answer it.
    WrongStore {
        store: StoreKind,
        intent: &'static str,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { store, message } => {
                write!(f, "{store} store connection failed: {message}")
            }
            Self::Query { store, message } => write!(f, "{store} store query failed: {message}"),
            Self::Decode { store, message } => {
                write!(f, "{store} store row decode failed: {message}")
            }
            Self::WrongStore { store, intent } => {
                write!(f, "intent '{intent}' cannot be answered by the {store} store")
            }
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// The two read-only stores, as the pipeline sees them.
///
/// Object-safe so the pipeline can take `&dyn Gateway`.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn fetch_analytics(&self, intent: &QueryIntent) -> Result<Vec<Record>, StoreError>;

    async fn fetch_transactional(&self, intent: &QueryIntent) -> Result<Vec<Record>, StoreError>;
}

/// Route an intent to the store that owns it.
pub async fn fetch(gateway: &dyn Gateway, intent: &QueryIntent) -> Result<Vec<Record>, StoreError> {
    match intent.store() {
        StoreKind::Analytics => gateway.fetch_analytics(intent).await,
        StoreKind::Transactional => gateway.fetch_transactional(intent).await,
    }
}
