//! ent-db
//!
//! SQL [`Gateway`](ent_reconcile::Gateway) over the two read-only stores.
//!
//! Architectural decisions:
//! - Analytics warehouse is spoken to over the PostgreSQL wire protocol (`$n` binds)
//! - LMS transactional database is MySQL (`?` binds)
//! - Uses sqlx `query()` + binds (no macros, no offline metadata)
//! - Learner keys are always bound; a keyed intent with no keys never renders
//! - Nothing here writes to either store

use anyhow::{Context, Result};

mod decode;
mod gateway;
mod sql;

pub use decode::{decode_mysql_row, decode_pg_row};
pub use gateway::{SqlGateway, StoreStatus, StoreUrls};
pub use sql::{
    render_analytics, render_transactional, RenderError, SqlQuery, ENTERPRISE_ENROLLMENT_TABLE,
};

pub const ENV_ANALYTICS_DB_URL: &str = "ENT_ANALYTICS_DATABASE_URL";
pub const ENV_LMS_DB_URL: &str = "ENT_LMS_DATABASE_URL";

impl StoreUrls {
    /// Read both URLs from the default env var names.
    pub fn from_env() -> Result<Self> {
        let analytics = std::env::var(ENV_ANALYTICS_DB_URL)
            .with_context(|| format!("missing env var {ENV_ANALYTICS_DB_URL}"))?;
        let transactional = std::env::var(ENV_LMS_DB_URL)
            .with_context(|| format!("missing env var {ENV_LMS_DB_URL}"))?;
        Ok(Self {
            analytics,
            transactional,
        })
    }
}
