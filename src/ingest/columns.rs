//! Table-driven header matching.

use super::workbook::{Cell, Sheet};
use crate::error::{ScheduleError, ScheduleResult};
use crate::text::fold;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Physician,
    Branch,
    Action,
    Date,
    StartTime,
    EndTime,
    Capacity,
}

/// Fields a sheet cannot be read without.
pub const REQUIRED_FIELDS: [Field; 2] = [Field::Physician, Field::Date];

/// Header synonyms in folded form, in resolution order. Fields whose
/// synonyms occur inside other headers ("aksiyon" in "aksiyon tarihi")
/// resolve after the fields that own those headers.
const SYNONYMS: &[(Field, &[&str])] = &[
    (Field::Date, &["aksiyon tarihi", "tarih", "date"]),
    (Field::StartTime, &["baslangic saati", "baslama saati", "baslangic", "start"]),
    (Field::EndTime, &["bitis saati", "bitis", "end"]),
    (Field::Capacity, &["kapasite", "randevu sayisi", "slot sayisi", "capacity"]),
    (Field::Branch, &["klinik adi", "klinik", "brans", "birim", "servis", "branch", "clinic", "department"]),
    (Field::Physician, &["hekim ad soyad", "hekim adi soyadi", "hekim adi", "hekim", "doktor", "physician", "doctor"]),
    (Field::Action, &["aksiyon", "faaliyet", "islem", "etkinlik", "action", "activity"]),
];

/// Field to column index for one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: BTreeMap<Field, usize>,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }
    
    pub fn len(&self) -> usize {
        self.columns.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
    
    pub fn missing(&self, fields: &[Field]) -> Vec<Field> {
        fields.iter().copied().filter(|f| !self.columns.contains_key(f)).collect()
    }
}

/// Header row location and its resolved columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHeader {
    pub row_index: usize,
    pub columns: ColumnMap,
}

pub struct ColumnResolver {
    table: Vec<(Field, Vec<String>)>,
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

impl ColumnResolver {
    /// Configured synonyms are tried before the built-in ones for the same field.
    pub fn new(extra_synonyms: &HashMap<Field, Vec<String>>) -> Self {
        let table = SYNONYMS
            .iter()
            .map(|(field, builtin)| {
                let mut synonyms: Vec<String> = extra_synonyms
                    .get(field)
                    .map(|extra| extra.iter().map(|s| fold(s)).filter(|s| !s.is_empty()).collect())
                    .unwrap_or_default();
                synonyms.extend(builtin.iter().map(|s| s.to_string()));
                (*field, synonyms)
            })
            .collect();
        
        Self { table }
    }
    
    /// Matches one candidate header row. Each column is claimed by at most one field.
    pub fn match_row(&self, cells: &[Cell]) -> ColumnMap {
        let headers: Vec<String> = cells.iter().map(|c| fold(&c.as_text())).collect();
        let mut claimed = vec![false; headers.len()];
        let mut columns = BTreeMap::new();
        
        for (field, synonyms) in &self.table {
            if let Some(index) = find_column(&headers, &claimed, synonyms) {
                claimed[index] = true;
                columns.insert(*field, index);
            }
        }
        
        ColumnMap { columns }
    }
    
    /// Picks the first of the leading `scan_rows` rows that matches at least
    /// `min_fields` fields, falling back to row 0, and checks required fields.
    pub fn resolve(&self, sheet: &Sheet, scan_rows: usize, min_fields: usize) -> ScheduleResult<ResolvedHeader> {
        let found = sheet
            .rows
            .iter()
            .take(scan_rows)
            .enumerate()
            .map(|(index, row)| (index, self.match_row(row)))
            .find(|(_, columns)| columns.len() >= min_fields);
        
        let (row_index, columns) = match found {
            Some(found) => found,
            // No row reached the threshold; judge the first row on its own
            None => {
                let first = sheet.rows.first().map(|row| self.match_row(row)).unwrap_or_default();
                (0, first)
            }
        };
        
        let missing = columns.missing(&REQUIRED_FIELDS);
        if !missing.is_empty() {
            return Err(ScheduleError::MissingColumns {
                sheet: sheet.name.clone(),
                missing,
            });
        }
        
        debug!("Sheet '{}': header at row {} with {} columns", sheet.name, row_index, columns.len());
        Ok(ResolvedHeader { row_index, columns })
    }
}

/// Exact header match first, then substring match, per synonym in order.
fn find_column(headers: &[String], claimed: &[bool], synonyms: &[String]) -> Option<usize> {
    for synonym in synonyms {
        let open = |index: &usize| !claimed[*index];
        
        if let Some(index) = (0..headers.len()).filter(open).find(|&i| headers[i] == *synonym) {
            return Some(index);
        }
        if let Some(index) = (0..headers.len())
            .filter(open)
            .find(|&i| !headers[i].is_empty() && headers[i].contains(synonym.as_str()))
        {
            return Some(index);
        }
    }
    None
}
