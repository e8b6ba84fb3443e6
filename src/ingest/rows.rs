use super::cells::{parse_clock, parse_date, parse_number, parse_time};
use super::columns::{ColumnMap, Field};
use super::workbook::Cell;
use crate::config::IngestConfig;
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{ActivityRecord, IngestDiagnostics};
use crate::text::{branch_key, collapse_whitespace, fold, physician_key};
use chrono::NaiveDate;
use log::debug;

const MINUTES_PER_DAY: u32 = 1440;

static EMPTY_CELL: Cell = Cell::Empty;

/// Turns raw rows beneath a resolved header into typed records.
pub struct RowNormalizer<'a> {
    columns: &'a ColumnMap,
    config: &'a IngestConfig,
    fallback_date: NaiveDate,
    default_start: u32,
    default_end: u32,
    total_markers: Vec<String>,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(columns: &'a ColumnMap, config: &'a IngestConfig, fallback_date: NaiveDate) -> ScheduleResult<Self> {
        let default_start = parse_clock(&config.default_start).ok_or_else(|| {
            ScheduleError::InvalidConfig(format!("Invalid default start time: {}", config.default_start))
        })?;
        let default_end = parse_clock(&config.default_end).ok_or_else(|| {
            ScheduleError::InvalidConfig(format!("Invalid default end time: {}", config.default_end))
        })?;
        let total_markers = config.total_markers.iter().map(|m| fold(m)).collect();
        
        Ok(Self {
            columns,
            config,
            fallback_date,
            default_start,
            default_end,
            total_markers,
        })
    }
    
    fn cell<'r>(&self, row: &'r [Cell], field: Field) -> &'r Cell {
        self.columns
            .get(field)
            .and_then(|index| row.get(index))
            .unwrap_or(&EMPTY_CELL)
    }
    
    fn is_total_row(&self, physician: &str) -> bool {
        let folded = fold(physician);
        self.total_markers.iter().any(|marker| folded == *marker || folded.starts_with(&format!("{} ", marker)))
    }
    
    /// Normalizes one row. Blank and total rows yield `None`; bad cells are
    /// replaced by defaults and counted in `diagnostics`.
    pub fn normalize(&self, row: &[Cell], diagnostics: &mut IngestDiagnostics) -> Option<ActivityRecord> {
        let physician_name = collapse_whitespace(&self.cell(row, Field::Physician).as_text());
        if physician_name.is_empty() || self.is_total_row(&physician_name) {
            return None;
        }
        
        let date = match parse_date(self.cell(row, Field::Date)) {
            Ok(Some(date)) => date,
            Ok(None) => {
                diagnostics.unparseable_date_count += 1;
                debug!("Missing date for '{}', using {}", physician_name, self.fallback_date);
                self.fallback_date
            }
            Err(e) => {
                diagnostics.unparseable_date_count += 1;
                debug!("{}; using {}", e, self.fallback_date);
                self.fallback_date
            }
        };
        
        let start_minute = self.time_or_default(row, Field::StartTime, self.default_start, diagnostics);
        let mut end_minute = self.time_or_default(row, Field::EndTime, self.default_end, diagnostics);
        if end_minute < start_minute {
            end_minute += MINUTES_PER_DAY;
        }
        if end_minute == start_minute {
            diagnostics.zero_duration_count += 1;
        }
        
        let capacity = match parse_number(self.cell(row, Field::Capacity)) {
            Ok(value) => value.unwrap_or(0.0).max(0.0),
            Err(e) => {
                diagnostics.unparseable_number_count += 1;
                debug!("{}; using 0", e);
                0.0
            }
        };
        
        let branch = collapse_whitespace(&self.cell(row, Field::Branch).as_text());
        let action = match collapse_whitespace(&self.cell(row, Field::Action).as_text()) {
            label if label.is_empty() => self.config.default_action.to_uppercase(),
            label => label.to_uppercase(),
        };
        
        Some(ActivityRecord {
            physician_key: physician_key(&physician_name),
            physician_name,
            branch_key: branch_key(&branch),
            branch,
            date,
            start_minute,
            end_minute,
            action,
            capacity,
        })
    }
    
    fn time_or_default(&self, row: &[Cell], field: Field, default: u32, diagnostics: &mut IngestDiagnostics) -> u32 {
        match parse_time(self.cell(row, field), field) {
            Ok(Some(minutes)) => minutes,
            Ok(None) => default,
            Err(e) => {
                diagnostics.unparseable_time_count += 1;
                debug!("{}; using default", e);
                default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::columns::ColumnResolver;
    
    fn columns() -> ColumnMap {
        ColumnResolver::default().match_row(
            &["Hekim", "Klinik", "Aksiyon", "Tarih", "Başlangıç", "Bitiş", "Kapasite"]
                .iter()
                .map(|h| Cell::Text(h.to_string()))
                .collect::<Vec<_>>(),
        )
    }
    
    fn row(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| if v.is_empty() { Cell::Empty } else { Cell::Text(v.to_string()) })
            .collect()
    }
    
    fn fallback() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }
    
    #[test]
    fn test_complete_row() {
        let columns = columns();
        let config = IngestConfig::default();
        let normalizer = RowNormalizer::new(&columns, &config, fallback()).unwrap();
        let mut diagnostics = IngestDiagnostics::default();
        
        let record = normalizer
            .normalize(&row(&["Dr. Ayşe  Yılmaz", "Kardiyoloji", "poliklinik", "10.01.2025", "08:00", "12:00", "20"]), &mut diagnostics)
            .unwrap();
        
        assert_eq!(record.physician_name, "Dr. Ayşe Yılmaz");
        assert_eq!(record.physician_key, "ayse yilmaz");
        assert_eq!(record.branch_key, "kardiyoloji");
        assert_eq!(record.action, "POLIKLINIK");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert_eq!((record.start_minute, record.end_minute), (480, 720));
        assert_eq!(record.capacity, 20.0);
        assert_eq!(diagnostics, IngestDiagnostics::default());
    }
    
    #[test]
    fn test_blank_and_total_rows_skipped() {
        let columns = columns();
        let config = IngestConfig::default();
        let normalizer = RowNormalizer::new(&columns, &config, fallback()).unwrap();
        let mut diagnostics = IngestDiagnostics::default();
        
        assert!(normalizer.normalize(&row(&["", "Kardiyoloji", "", "10.01.2025", "", "", "5"]), &mut diagnostics).is_none());
        assert!(normalizer.normalize(&row(&["TOPLAM", "", "", "", "", "", "500"]), &mut diagnostics).is_none());
        assert!(normalizer.normalize(&row(&["Genel Toplam", "", "", "", "", "", "900"]), &mut diagnostics).is_none());
    }
    
    #[test]
    fn test_defaults_and_counters() {
        let columns = columns();
        let config = IngestConfig::default();
        let normalizer = RowNormalizer::new(&columns, &config, fallback()).unwrap();
        let mut diagnostics = IngestDiagnostics::default();
        
        let record = normalizer
            .normalize(&row(&["Ali Can", "", "", "bilinmiyor", "sabah", "", "yirmi"]), &mut diagnostics)
            .unwrap();
        
        assert_eq!(record.date, fallback());
        assert_eq!((record.start_minute, record.end_minute), (480, 1020));
        assert_eq!(record.capacity, 0.0);
        assert_eq!(record.action, "BELIRTILMEMIS");
        assert_eq!(diagnostics.unparseable_date_count, 1);
        assert_eq!(diagnostics.unparseable_time_count, 1);
        assert_eq!(diagnostics.unparseable_number_count, 1);
    }
    
    #[test]
    fn test_whole_number_times_fall_back_to_defaults() {
        let columns = columns();
        let config = IngestConfig::default();
        let normalizer = RowNormalizer::new(&columns, &config, fallback()).unwrap();
        let mut diagnostics = IngestDiagnostics::default();
        
        let mut cells = row(&["Ali Can", "", "", "10.01.2025", "", "", ""]);
        cells[4] = Cell::Number(8.0);
        cells[5] = Cell::Number(12.0);
        let record = normalizer.normalize(&cells, &mut diagnostics).unwrap();
        
        assert_eq!((record.start_minute, record.end_minute), (480, 1020));
        assert_eq!(diagnostics.unparseable_time_count, 2);
        assert_eq!(diagnostics.zero_duration_count, 0);
    }
    
    #[test]
    fn test_midnight_crossing_and_zero_duration() {
        let columns = columns();
        let config = IngestConfig::default();
        let normalizer = RowNormalizer::new(&columns, &config, fallback()).unwrap();
        let mut diagnostics = IngestDiagnostics::default();
        
        let night = normalizer
            .normalize(&row(&["Ali Can", "Acil", "NÖBET", "10.01.2025", "20:00", "08:00", ""]), &mut diagnostics)
            .unwrap();
        assert_eq!((night.start_minute, night.end_minute), (1200, 1920));
        assert_eq!(night.duration_minutes(), 720);
        
        let empty = normalizer
            .normalize(&row(&["Ali Can", "Acil", "NÖBET", "10.01.2025", "09:00", "09:00", ""]), &mut diagnostics)
            .unwrap();
        assert_eq!(empty.duration_minutes(), 0);
        assert_eq!(diagnostics.zero_duration_count, 1);
    }
}
