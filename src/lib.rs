//! Physician work-schedule reconciliation.
//!
//! Spreadsheet rows are normalized into activity records, attributed to
//! morning and afternoon sessions, aggregated per physician into an immutable
//! [`ScheduleVersion`], and two versions are compared on demand.

pub mod aggregation;
pub mod attribution;
pub mod config;
pub mod diff;
pub mod error;
pub mod ingest;
pub mod models;
pub mod output;
pub mod store;
pub mod text;

pub use config::Config;
pub use diff::{compare_stored, compare_versions, ComparisonRequest, ComparisonResult};
pub use error::{ScheduleError, ScheduleResult};
pub use ingest::{IngestRequest, Ingestor, Workbook};
pub use models::{ActivityRecord, IngestDiagnostics, PeriodKey, PhysicianSummary, ScheduleVersion};
pub use store::{FileVersionStore, MemoryVersionStore, VersionId, VersionStore};
