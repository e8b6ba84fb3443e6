use crate::error::{ScheduleError, ScheduleResult};
use crate::ingest::columns::Field;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reporting scope of one upload: a hospital and a calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub hospital_id: String,
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn new(hospital_id: impl Into<String>, year: i32, month: u32) -> ScheduleResult<Self> {
        let hospital_id = hospital_id.into();
        if hospital_id.trim().is_empty() {
            return Err(ScheduleError::Validation("Hospital id must not be empty".to_string()));
        }
        if !(1..=12).contains(&month) {
            return Err(ScheduleError::Validation(
                format!("Month must be between 1 and 12, got {}", month)
            ));
        }
        NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            ScheduleError::Validation(format!("Year out of range: {}", year))
        })?;
        
        Ok(Self { hospital_id, year, month })
    }
    
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:02}", self.hospital_id, self.year, self.month)
    }
}

/// One physician-activity interval parsed from a spreadsheet row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub physician_name: String,
    pub physician_key: String,
    pub branch: String,
    pub branch_key: String,
    pub date: NaiveDate,
    pub start_minute: u32,
    pub end_minute: u32,   // Past 1439 when the interval crosses midnight
    pub action: String,
    pub capacity: f64,
}

impl ActivityRecord {
    pub fn duration_minutes(&self) -> u32 {
        self.end_minute.saturating_sub(self.start_minute)
    }
    
    pub fn identity_key(&self) -> String {
        format!("{}|{}", self.physician_key, self.branch_key)
    }
}

/// Aggregated workload of one physician within one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicianSummary {
    /// Longest display form seen across the merged records, first one on ties.
    pub name: String,
    /// Chosen the same way as `name`.
    pub branch: String,
    pub total_capacity: f64,
    pub total_work_days: f64,
    pub action_days: BTreeMap<String, f64>,
    pub raw_records: Vec<ActivityRecord>,
}

impl PhysicianSummary {
    pub fn new(name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branch: branch.into(),
            total_capacity: 0.0,
            total_work_days: 0.0,
            action_days: BTreeMap::new(),
            raw_records: Vec::new(),
        }
    }
    
    pub fn is_empty(&self) -> bool {
        self.raw_records.is_empty() && self.total_capacity == 0.0 && self.total_work_days == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSheet {
    pub sheet: String,
    pub missing: Vec<Field>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestDiagnostics {
    pub sheet_count: usize,
    pub raw_row_count: usize,
    pub valid_row_count: usize,
    pub invalid_row_count: usize,
    pub unparseable_date_count: usize,
    pub unparseable_time_count: usize,
    pub unparseable_number_count: usize,
    pub zero_duration_count: usize,
    pub skipped_sheets: Vec<SkippedSheet>,
}

impl IngestDiagnostics {
    pub fn merge(&mut self, other: IngestDiagnostics) {
        self.sheet_count += other.sheet_count;
        self.raw_row_count += other.raw_row_count;
        self.valid_row_count += other.valid_row_count;
        self.invalid_row_count += other.invalid_row_count;
        self.unparseable_date_count += other.unparseable_date_count;
        self.unparseable_time_count += other.unparseable_time_count;
        self.unparseable_number_count += other.unparseable_number_count;
        self.zero_duration_count += other.zero_duration_count;
        self.skipped_sheets.extend(other.skipped_sheets);
    }
}

/// Immutable snapshot of all physician summaries derived from one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleVersion {
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub source_file_name: String,
    pub period: PeriodKey,
    pub physicians: BTreeMap<String, PhysicianSummary>,
    pub diagnostics: IngestDiagnostics,
}

impl ScheduleVersion {
    pub fn total_capacity(&self) -> f64 {
        self.physicians.values().map(|p| p.total_capacity).sum()
    }
    
    pub fn total_work_days(&self) -> f64 {
        self.physicians.values().map(|p| p.total_work_days).sum()
    }
    
    /// Capacity summed per branch display name.
    pub fn branch_totals(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for summary in self.physicians.values() {
            *totals.entry(summary.branch.clone()).or_insert(0.0) += summary.total_capacity;
        }
        totals
    }
}
