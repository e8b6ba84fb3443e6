use thiserror::Error;
use crate::ingest::columns::Field;
use crate::models::IngestDiagnostics;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    
    #[error("Workbook error: {0}")]
    Workbook(String),
    
    #[error("Sheet '{sheet}' is missing required columns: {missing:?}")]
    MissingColumns {
        sheet: String,
        missing: Vec<Field>,
    },
    
    #[error("Unparseable {field:?} value: '{raw}'")]
    UnparseableValue {
        field: Field,
        raw: String,
    },
    
    #[error("No data rows found in workbook ({} raw rows read)", .0.raw_row_count)]
    EmptyWorkbook(Box<IngestDiagnostics>),
    
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    
    #[error("Validation error: {0}")]
    Validation(String),
    
    #[error("Version store error: {0}")]
    Store(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
