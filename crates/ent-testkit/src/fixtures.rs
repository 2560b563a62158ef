//! Table builders and canned scenarios.

use chrono::{NaiveDate, NaiveDateTime};

use crate::memory_gateway::{
    AnalyticsEnrollment, AuthUser, ConsentRow, CourseLink, CustomerUser, PlatformEnrollment,
    Tables,
};

/// Enterprise customer ids in the warehouse's hyphenated form.
pub const ACME_ID: &str = "8a8c6e2b-1f0e-4a1c-9a3e-0123456789ab";
pub const GLOBEX_ID: &str = "5f0c1d2e-3b4a-4c5d-8e6f-a1b2c3d4e5f6";

/// Midnight on the given date.
pub fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_else(|| panic!("invalid fixture date {y}-{m}-{d}"))
}

impl Tables {
    /// Warehouse row with no linked course, plus the matching `auth_user`.
    pub fn add_unlinked_learner(
        &mut self,
        id: i64,
        username: &str,
        enterprise_id: &str,
        enterprise_name: &str,
        date_joined: NaiveDateTime,
    ) -> &mut Self {
        self.analytics_enrollments.push(AnalyticsEnrollment {
            lms_user_id: Some(id),
            user_username: Some(username.to_string()),
            enterprise_id: enterprise_id.to_string(),
            enterprise_name: enterprise_name.to_string(),
            course_id: None,
            consent_granted: None,
        });
        self.auth_users.push(AuthUser {
            id,
            username: username.to_string(),
            date_joined,
        });
        self
    }

    /// Warehouse row for an enrollment that *is* linked to a course.
    pub fn add_linked_analytics_row(
        &mut self,
        id: i64,
        enterprise_id: &str,
        course_id: &str,
        consent_granted: Option<bool>,
    ) -> &mut Self {
        self.analytics_enrollments.push(AnalyticsEnrollment {
            lms_user_id: Some(id),
            user_username: None,
            enterprise_id: enterprise_id.to_string(),
            enterprise_name: String::new(),
            course_id: Some(course_id.to_string()),
            consent_granted,
        });
        self
    }

    /// The LMS keeps the customer id as 32 hex digits; hyphens are dropped.
    pub fn add_customer_user(
        &mut self,
        ecu_id: i64,
        user_id: i64,
        enterprise_customer_id: &str,
        created: NaiveDateTime,
    ) -> &mut Self {
        self.customer_users.push(CustomerUser {
            id: ecu_id,
            user_id,
            enterprise_customer_id: enterprise_customer_id.replace('-', "").to_lowercase(),
            created,
        });
        self
    }

    pub fn add_enrollment(
        &mut self,
        user_id: i64,
        course_id: &str,
        created: NaiveDateTime,
    ) -> &mut Self {
        self.platform_enrollments.push(PlatformEnrollment {
            user_id,
            course_id: course_id.to_string(),
            created,
            is_active: true,
            mode: "verified".to_string(),
        });
        self
    }

    pub fn add_course_link(
        &mut self,
        ecu_id: i64,
        course_id: &str,
        created: NaiveDateTime,
    ) -> &mut Self {
        self.course_links.push(CourseLink {
            enterprise_customer_user_id: ecu_id,
            course_id: course_id.to_string(),
            created,
            modified: created,
        });
        self
    }

    pub fn add_consent(
        &mut self,
        username: &str,
        course_id: &str,
        granted: Option<bool>,
        created: NaiveDateTime,
    ) -> &mut Self {
        self.consents.push(ConsentRow {
            username: username.to_string(),
            course_id: course_id.to_string(),
            granted,
            created,
        });
        self
    }
}

/// User 7 "ann" of Acme: ECU created 2020-01-05, one enrollment in X101
/// created at `enrollment_created`, no enterprise course enrollment.
pub fn ann_scenario(enrollment_created: NaiveDateTime) -> Tables {
    let mut t = Tables::default();
    t.add_unlinked_learner(7, "ann", ACME_ID, "Acme", ts(2019, 6, 1))
        .add_customer_user(70, 7, ACME_ID, ts(2020, 1, 5))
        .add_enrollment(7, "X101", enrollment_created);
    t
}
