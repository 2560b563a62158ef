//! Enterprise learner entity and the incidental-enrollment rule.

use chrono::NaiveDateTime;

use crate::columns;
use crate::{Record, RecordError, UserKey, TIMESTAMP_FORMAT};

/// One `student_courseenrollment` row, typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CourseEnrollment {
    pub course_id: String,
    pub created: NaiveDateTime,
    pub is_active: bool,
    pub mode: String,
}

impl CourseEnrollment {
    /// `Course ID, Enrollment Created, Enrollment Active, Enrollment Mode`
    pub fn export_fields(&self) -> [String; 4] {
        [
            self.course_id.clone(),
            self.created.format(TIMESTAMP_FORMAT).to_string(),
            if self.is_active { "True" } else { "False" }.to_string(),
            self.mode.clone(),
        ]
    }
}

impl TryFrom<&Record> for CourseEnrollment {
    type Error = RecordError;

    fn try_from(r: &Record) -> Result<Self, Self::Error> {
        let is_active = r
            .flag(columns::IS_ACTIVE)?
            .ok_or_else(|| RecordError::NullField {
                column: columns::IS_ACTIVE.to_string(),
            })?;
        Ok(Self {
            course_id: r.require(columns::COURSE_ID)?.to_string(),
            created: r.timestamp(columns::CREATED)?,
            is_active,
            mode: r.display(columns::MODE)?,
        })
    }
}

/// A learner with platform course enrollments but no enterprise course
/// enrollment. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnterpriseLearner {
    user_key: UserKey,
    username: String,
    enterprise_name: String,
    ecu_created: NaiveDateTime,
    enrollments: Vec<CourseEnrollment>,
}

impl EnterpriseLearner {
    pub fn new(
        user_key: UserKey,
        username: impl Into<String>,
        enterprise_name: impl Into<String>,
        ecu_created: NaiveDateTime,
        enrollments: Vec<CourseEnrollment>,
    ) -> Self {
        Self {
            user_key,
            username: username.into(),
            enterprise_name: enterprise_name.into(),
            ecu_created,
            enrollments,
        }
    }

    /// Build from the three already-correlated inputs: the analytics
    /// identity row, the enterprise-customer-user row, and the learner's
    /// course enrollment rows.
    pub fn from_correlated(
        user_key: UserKey,
        identity: &Record,
        enterprise_customer_user: &Record,
        enrollments: &[Record],
    ) -> Result<Self, RecordError> {
        let enrollments = enrollments
            .iter()
            .map(CourseEnrollment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(
            user_key,
            identity.display(columns::USER_USERNAME)?,
            identity.display(columns::ENTERPRISE_NAME)?,
            enterprise_customer_user.timestamp(columns::CREATED)?,
            enrollments,
        ))
    }

    pub fn user_key(&self) -> &UserKey {
        &self.user_key
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn enterprise_name(&self) -> &str {
        &self.enterprise_name
    }

    pub fn ecu_created(&self) -> NaiveDateTime {
        self.ecu_created
    }

    pub fn enrollments(&self) -> &[CourseEnrollment] {
        &self.enrollments
    }

    /// Enrollments in owned order. With `exclude_incidental`, only those
    /// created at or after the enterprise-customer-user record survive.
    pub fn filtered_enrollments(&self, exclude_incidental: bool) -> Vec<&CourseEnrollment> {
        self.enrollments
            .iter()
            .filter(|e| !exclude_incidental || e.created >= self.ecu_created)
            .collect()
    }

    /// `LMS User ID, LMS Username, Enterprise Customer Name, EnterpriseCustomerUser Created`
    pub fn identity_fields(&self) -> [String; 4] {
        [
            self.user_key.to_string(),
            self.username.clone(),
            self.enterprise_name.clone(),
            self.ecu_created.format(TIMESTAMP_FORMAT).to_string(),
        ]
    }
}
