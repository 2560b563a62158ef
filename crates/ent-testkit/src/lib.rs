//! ent-testkit
//!
//! In-memory stores and sinks for scenario tests. Deterministic; no IO.

pub mod fixtures;
mod memory_gateway;

use std::convert::Infallible;

use ent_reconcile::RowSink;

pub use fixtures::{ann_scenario, ts, ACME_ID, GLOBEX_ID};
pub use memory_gateway::{
    AnalyticsEnrollment, AuthUser, ConsentRow, CourseLink, CustomerUser, MemoryGateway,
    PlatformEnrollment, Tables,
};

/// Collects exported rows in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowSink for MemorySink {
    type Error = Infallible;

    fn write_header(&mut self, header: &[&str]) -> Result<(), Self::Error> {
        self.header = header.iter().map(|h| h.to_string()).collect();
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), Self::Error> {
        self.rows.push(row.to_vec());
        Ok(())
    }
}
