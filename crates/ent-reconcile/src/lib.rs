//! ent-reconcile
//!
//! Enterprise enrollment reconciliation core.
//!
//! Architectural decisions:
//! - Rows from either store are immutable [`Record`]s keyed by a canonical [`UserKey`]
//! - Every stage derives a new named [`Population`]; nothing is narrowed in place
//! - The pipeline speaks in [`QueryIntent`]s; SQL lives behind the [`Gateway`] trait
//! - Any store failure aborts the run; an empty join result is valid data
//! - Enrollments created before the enterprise relationship are incidental and
//!   excluded from the export by default
//!
//! Deterministic, pure logic. No IO. No SQL.

mod canonical;
mod export;
mod intent;
mod learner;
mod pipeline;
mod types;

pub use canonical::{canonicalize, group_by_user};
pub use export::{export_rows, export_to, learner_rows, RowSink, EXPORT_HEADER};
pub use intent::{columns, fetch, ConsentFilter, CustomerScope, Gateway, QueryIntent, StoreError, StoreKind};
pub use learner::{CourseEnrollment, EnterpriseLearner};
pub use pipeline::{
    classify_account_age, run_pipeline, AccountAge, AccountAgeSplit,
    ConsentAudit, ConsentDecisions, ConsentEnrollmentCounts, PipelineOptions, ReconcileError,
    ReconcileReport, ReconcileSummary, DEFAULT_KEY_BATCH_SIZE, ENTERPRISE_CUTOFF_DATE,
};
pub use types::*;
