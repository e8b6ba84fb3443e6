//! In-memory workbook representation and the readers that produce it.

use crate::error::{ScheduleError, ScheduleResult};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use log::{debug, warn};
use std::io::{Cursor, Read};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
    
    /// Display form used for header matching and text fields.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::DateTime(dt) => dt.to_string(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(n) => Cell::Number(*n as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::Error(_) => Cell::Empty,
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(value) => Cell::DateTime(value),
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => Cell::Text(s.clone()),
            Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { name: name.into(), rows }
    }
    
    /// Builds a sheet from text cells, mostly useful for CSV input and tests.
    pub fn from_text_rows(name: impl Into<String>, rows: &[Vec<&str>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|value| text_cell(value)).collect())
            .collect();
        Self::new(name, rows)
    }
}

fn text_cell(value: &str) -> Cell {
    if value.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }
    
    /// Reads a workbook file, choosing the CSV reader for `.csv` files.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ScheduleResult<Self> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        
        if is_csv {
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("csv")
                .to_string();
            let file = std::fs::File::open(path)?;
            Self::from_csv_reader(&name, file)
        } else {
            let bytes = std::fs::read(path)?;
            Self::from_bytes(bytes)
        }
    }
    
    /// Reads xlsx, xls, xlsb or ods content from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> ScheduleResult<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ScheduleError::Workbook(e.to_string()))?;
        
        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            match workbook.worksheet_range(&sheet_name) {
                Ok(range) => {
                    let rows: Vec<Vec<Cell>> = range
                        .rows()
                        .map(|row| row.iter().map(Cell::from).collect())
                        .collect();
                    debug!("Read sheet '{}' with {} rows", sheet_name, rows.len());
                    sheets.push(Sheet::new(sheet_name, rows));
                }
                Err(e) => warn!("Skipping unreadable sheet '{}': {}", sheet_name, e),
            }
        }
        
        Ok(Self { sheets })
    }
    
    /// Reads a single-sheet workbook from CSV. Delimiter `;` is detected from the header line.
    pub fn from_csv_reader<R: Read>(name: &str, mut reader: R) -> ScheduleResult<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        
        let first_line = content.lines().next().unwrap_or("");
        let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
            b';'
        } else {
            b','
        };
        
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(content.as_bytes());
        
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(text_cell).collect());
        }
        
        Ok(Self { sheets: vec![Sheet::new(name, rows)] })
    }
    
    pub fn is_empty(&self) -> bool {
        self.sheets.iter().all(|sheet| sheet.rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_csv_reader_semicolon() {
        let content = "Hekim;Tarih;Kapasite\nDr. Ali Can;10.01.2025;12,5\n";
        let workbook = Workbook::from_csv_reader("ocak", content.as_bytes()).unwrap();
        assert_eq!(workbook.sheets.len(), 1);
        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.name, "ocak");
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1][2], Cell::Text("12,5".to_string()));
    }
    
    #[test]
    fn test_csv_reader_empty_cells() {
        let content = "Hekim,Tarih,Kapasite\nAli,,\n";
        let workbook = Workbook::from_csv_reader("s", content.as_bytes()).unwrap();
        assert_eq!(workbook.sheets[0].rows[1][1], Cell::Empty);
    }
    
    #[test]
    fn test_invalid_bytes_rejected() {
        let result = Workbook::from_bytes(b"not a workbook".to_vec());
        assert!(matches!(result, Err(ScheduleError::Workbook(_))));
    }
    
    #[test]
    fn test_cell_text_forms() {
        assert_eq!(Cell::Number(20.0).as_text(), "20");
        assert_eq!(Cell::Number(2.5).as_text(), "2.5");
        assert!(Cell::Text("   ".to_string()).is_empty());
    }
    
    #[test]
    fn test_cells_from_calamine_data() {
        use crate::ingest::cells::{parse_date, parse_time};
        use crate::ingest::columns::Field;
        use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};
        use chrono::NaiveDate;
        
        let serial = Data::DateTime(ExcelDateTime::new(45667.5, ExcelDateTimeType::DateTime, false));
        let cell = Cell::from(&serial);
        assert!(matches!(cell, Cell::DateTime(_)));
        assert_eq!(parse_date(&cell).unwrap(), NaiveDate::from_ymd_opt(2025, 1, 10));
        assert_eq!(parse_time(&cell, Field::StartTime).unwrap(), Some(720));
        
        assert_eq!(Cell::from(&Data::Int(20)), Cell::Number(20.0));
        assert_eq!(Cell::from(&Data::Float(0.5)), Cell::Number(0.5));
        assert_eq!(Cell::from(&Data::String("Hekim".to_string())), Cell::Text("Hekim".to_string()));
        assert_eq!(
            Cell::from(&Data::DateTimeIso("2025-01-10T08:00:00".to_string())),
            Cell::Text("2025-01-10T08:00:00".to_string())
        );
        assert_eq!(Cell::from(&Data::Error(CellErrorType::NA)), Cell::Empty);
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
    }
}
