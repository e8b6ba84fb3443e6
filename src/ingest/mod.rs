pub mod cells;
pub mod columns;
pub mod rows;
pub mod workbook;

use crate::aggregation::PhysicianAggregator;
use crate::attribution::DominanceRule;
use crate::config::Config;
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{ActivityRecord, IngestDiagnostics, PeriodKey, ScheduleVersion, SkippedSheet};
use chrono::Utc;
use log::{info, warn};

pub use columns::{ColumnResolver, Field};
pub use rows::RowNormalizer;
pub use workbook::{Cell, Sheet, Workbook};

/// Context supplied with an upload.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub period: PeriodKey,
    pub label: String,
    pub source_file_name: String,
}

/// Records and counters produced from one sheet.
#[derive(Debug, Default)]
pub struct SheetOutcome {
    pub records: Vec<ActivityRecord>,
    pub diagnostics: IngestDiagnostics,
}

pub struct Ingestor {
    config: Config,
    resolver: ColumnResolver,
}

impl Ingestor {
    pub fn new(config: Config) -> Self {
        let resolver = ColumnResolver::new(&config.ingest.extra_synonyms);
        Self { config, resolver }
    }
    
    /// Resolves the header of one sheet and normalizes every row beneath it.
    /// A sheet without the required columns yields no records and a skipped-sheet entry.
    pub fn read_sheet(&self, sheet: &Sheet, period: &PeriodKey) -> ScheduleResult<SheetOutcome> {
        let mut outcome = SheetOutcome::default();
        outcome.diagnostics.sheet_count = 1;
        
        let ingest = &self.config.ingest;
        let header = match self.resolver.resolve(sheet, ingest.header_scan_rows, ingest.min_header_fields) {
            Ok(header) => header,
            Err(ScheduleError::MissingColumns { sheet, missing }) => {
                warn!("Skipping sheet '{}': missing columns {:?}", sheet, missing);
                outcome.diagnostics.skipped_sheets.push(SkippedSheet { sheet, missing });
                return Ok(outcome);
            }
            Err(e) => return Err(e),
        };
        
        let fallback_date = period.first_day().ok_or_else(|| {
            ScheduleError::Validation(format!("Period has no first day: {}", period))
        })?;
        let normalizer = RowNormalizer::new(&header.columns, ingest, fallback_date)?;
        
        for row in sheet.rows.iter().skip(header.row_index + 1) {
            if row.iter().all(Cell::is_empty) {
                continue;
            }
            outcome.diagnostics.raw_row_count += 1;
            
            match normalizer.normalize(row, &mut outcome.diagnostics) {
                Some(record) => outcome.records.push(record),
                None => outcome.diagnostics.invalid_row_count += 1,
            }
        }
        outcome.diagnostics.valid_row_count = outcome.records.len();
        
        info!(
            "Sheet '{}': {} rows read, {} valid",
            sheet.name, outcome.diagnostics.raw_row_count, outcome.diagnostics.valid_row_count
        );
        Ok(outcome)
    }
    
    /// Runs the full pipeline for one workbook and returns the new version.
    ///
    /// Fails with `EmptyWorkbook` when no sheet produced a usable record.
    pub fn ingest(&self, workbook: &Workbook, request: IngestRequest) -> ScheduleResult<ScheduleVersion> {
        info!(
            "Ingesting '{}' for {} as '{}' ({} sheets)",
            request.source_file_name, request.period, request.label, workbook.sheets.len()
        );
        
        let mut records = Vec::new();
        let mut diagnostics = IngestDiagnostics::default();
        
        for sheet in &workbook.sheets {
            let outcome = self.read_sheet(sheet, &request.period)?;
            records.extend(outcome.records);
            diagnostics.merge(outcome.diagnostics);
        }
        
        if records.is_empty() {
            warn!("No data rows found in '{}'", request.source_file_name);
            return Err(ScheduleError::EmptyWorkbook(Box::new(diagnostics)));
        }
        
        let aggregator = PhysicianAggregator::new(DominanceRule::from(&self.config.attribution));
        let physicians = aggregator.aggregate(records);
        info!("Aggregated {} physicians from {} valid rows", physicians.len(), diagnostics.valid_row_count);
        
        Ok(ScheduleVersion {
            label: request.label,
            created_at: Utc::now(),
            source_file_name: request.source_file_name,
            period: request.period,
            physicians,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    
    fn request(label: &str) -> IngestRequest {
        IngestRequest {
            period: PeriodKey::new("H1", 2025, 1).unwrap(),
            label: label.to_string(),
            source_file_name: "ocak.xlsx".to_string(),
        }
    }
    
    fn schedule_sheet() -> Sheet {
        Sheet::from_text_rows("Ocak", &[
            vec!["Ocak 2025 Hekim Çalışma Çizelgesi", "", "", "", "", "", ""],
            vec!["Hekim Ad Soyad", "Klinik Adı", "Aksiyon", "Aksiyon Tarihi", "Başlangıç Saati", "Bitiş Saati", "Kapasite"],
            vec!["Dr. Ayşe Yılmaz", "Kardiyoloji", "POLIKLINIK", "10.01.2025", "08:00", "12:00", "20"],
            vec!["Dr. Ayşe Yılmaz", "Kardiyoloji", "AMELIYAT", "10.01.2025", "13:00", "17:00", ""],
            vec!["Op. Dr. Mehmet Öz", "Genel Cerrahi", "AMELIYAT", "10.01.2025", "08:00", "11:00", "0"],
            vec!["Op. Dr. Mehmet Öz", "Genel Cerrahi", "POLIKLINIK", "10.01.2025", "08:30", "10:00", "12"],
            vec!["", "", "", "", "", "", ""],
            vec!["TOPLAM", "", "", "", "", "", "32"],
        ])
    }
    
    #[test]
    fn test_ingest_workbook() {
        let ingestor = Ingestor::new(Config::default());
        let workbook = Workbook::new(vec![schedule_sheet()]);
        let version = ingestor.ingest(&workbook, request("v1")).unwrap();
        
        assert_eq!(version.physicians.len(), 2);
        let ayse = &version.physicians["ayse yilmaz|kardiyoloji"];
        assert_relative_eq!(ayse.total_capacity, 20.0);
        assert_relative_eq!(ayse.total_work_days, 1.0);
        assert_relative_eq!(ayse.action_days["AMELIYAT"], 0.5);
        
        let mehmet = &version.physicians["mehmet oz|genel cerrahi"];
        assert_relative_eq!(mehmet.action_days["AMELIYAT"], 0.5);
        assert!(!mehmet.action_days.contains_key("POLIKLINIK"));
        assert_relative_eq!(mehmet.total_capacity, 12.0);
        
        let diagnostics = &version.diagnostics;
        assert_eq!(diagnostics.raw_row_count, 5);
        assert_eq!(diagnostics.valid_row_count, 4);
        assert_eq!(diagnostics.invalid_row_count, 1);
        assert_eq!(diagnostics.sheet_count, 1);
    }
    
    #[test]
    fn test_reingest_is_idempotent() {
        let ingestor = Ingestor::new(Config::default());
        let workbook = Workbook::new(vec![schedule_sheet()]);
        let first = ingestor.ingest(&workbook, request("v1")).unwrap();
        let second = ingestor.ingest(&workbook, request("v2")).unwrap();
        
        assert_eq!(
            serde_json::to_string(&first.physicians).unwrap(),
            serde_json::to_string(&second.physicians).unwrap()
        );
        assert_eq!(first.diagnostics, second.diagnostics);
    }
    
    #[test]
    fn test_sheet_missing_columns_is_skipped() {
        let ingestor = Ingestor::new(Config::default());
        let notes = Sheet::from_text_rows("Notlar", &[vec!["Açıklama"], vec!["Bayram tatili"]]);
        let workbook = Workbook::new(vec![notes, schedule_sheet()]);
        let version = ingestor.ingest(&workbook, request("v1")).unwrap();
        
        assert_eq!(version.diagnostics.sheet_count, 2);
        assert_eq!(version.diagnostics.skipped_sheets.len(), 1);
        assert_eq!(version.diagnostics.skipped_sheets[0].sheet, "Notlar");
        assert_eq!(version.physicians.len(), 2);
    }
    
    #[test]
    fn test_empty_workbook() {
        let ingestor = Ingestor::new(Config::default());
        let sheet = Sheet::from_text_rows("Boş", &[
            vec!["Hekim", "Tarih"],
            vec!["Toplam", ""],
        ]);
        let result = ingestor.ingest(&Workbook::new(vec![sheet]), request("v1"));
        
        match result {
            Err(ScheduleError::EmptyWorkbook(diagnostics)) => {
                assert_eq!(diagnostics.raw_row_count, 1);
                assert_eq!(diagnostics.valid_row_count, 0);
            }
            other => panic!("expected EmptyWorkbook, got {:?}", other),
        }
    }
}
