use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use ent_reconcile::{Gateway, QueryIntent, Record, StoreError, StoreKind};

use crate::decode::{decode_mysql_row, decode_pg_row};
use crate::sql::{render_analytics, render_transactional, SqlQuery};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection URLs for both stores. **Redacted in `Debug`.**
#[derive(Clone)]
pub struct StoreUrls {
    pub analytics: String,
    pub transactional: String,
}

impl fmt::Debug for StoreUrls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreUrls")
            .field("analytics", &"<REDACTED>")
            .field("transactional", &"<REDACTED>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStatus {
    pub analytics_ok: bool,
    pub transactional_ok: bool,
}

/// Read-only SQL gateway over the analytics warehouse and the LMS database.
#[derive(Clone)]
pub struct SqlGateway {
    analytics: PgPool,
    transactional: MySqlPool,
}

fn connection_error(store: StoreKind, e: sqlx::Error) -> StoreError {
    StoreError::Connection {
        store,
        message: e.to_string(),
    }
}

fn query_error(store: StoreKind, intent: &QueryIntent, e: sqlx::Error) -> StoreError {
    StoreError::Query {
        store,
        message: format!("{}: {e}", intent.name()),
    }
}

impl SqlGateway {
    pub async fn connect(urls: &StoreUrls) -> Result<Self, StoreError> {
        let analytics = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(&urls.analytics)
            .await
            .map_err(|e| connection_error(StoreKind::Analytics, e))?;

        let transactional = match MySqlPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(&urls.transactional)
            .await
        {
            Ok(pool) => pool,
            Err(e) => {
                analytics.close().await;
                return Err(connection_error(StoreKind::Transactional, e));
            }
        };

        Ok(Self {
            analytics,
            transactional,
        })
    }

    /// `select 1` against each store.
    pub async fn ping(&self) -> Result<StoreStatus, StoreError> {
        let (a,): (i32,) = sqlx::query_as("select 1")
            .fetch_one(&self.analytics)
            .await
            .map_err(|e| connection_error(StoreKind::Analytics, e))?;
        let (t,): (i64,) = sqlx::query_as("select 1")
            .fetch_one(&self.transactional)
            .await
            .map_err(|e| connection_error(StoreKind::Transactional, e))?;
        Ok(StoreStatus {
            analytics_ok: a == 1,
            transactional_ok: t == 1,
        })
    }

    /// Release both pools. Idempotent.
    pub async fn close(&self) {
        self.analytics.close().await;
        self.transactional.close().await;
    }
}

#[async_trait]
impl Gateway for SqlGateway {
    async fn fetch_analytics(&self, intent: &QueryIntent) -> Result<Vec<Record>, StoreError> {
        let SqlQuery { sql, binds } = render_analytics(intent)?;
        debug!(intent = intent.name(), binds = binds.len(), "analytics query");
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind.as_str());
        }
        let rows = query
            .fetch_all(&self.analytics)
            .await
            .map_err(|e| query_error(StoreKind::Analytics, intent, e))?;
        rows.iter().map(decode_pg_row).collect()
    }

    async fn fetch_transactional(&self, intent: &QueryIntent) -> Result<Vec<Record>, StoreError> {
        let SqlQuery { sql, binds } = render_transactional(intent)?;
        debug!(intent = intent.name(), binds = binds.len(), "transactional query");
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind.as_str());
        }
        let rows = query
            .fetch_all(&self.transactional)
            .await
            .map_err(|e| query_error(StoreKind::Transactional, intent, e))?;
        rows.iter().map(decode_mysql_row).collect()
    }
}
