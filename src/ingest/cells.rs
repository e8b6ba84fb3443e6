//! Parsing of date, time and number cells in the encodings schedule sheets use.
//!
//! Each parser returns `Ok(None)` for an empty cell and
//! `Err(ScheduleError::UnparseableValue)` for content it cannot read; the row
//! normalizer decides on the fallback.

use super::columns::Field;
use super::workbook::Cell;
use crate::error::{ScheduleError, ScheduleResult};
use chrono::{Datelike, Duration, NaiveDate, Timelike};

const MINUTES_PER_DAY: u32 = 1440;

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

fn unparseable(field: Field, cell: &Cell) -> ScheduleError {
    ScheduleError::UnparseableValue {
        field,
        raw: cell.as_text(),
    }
}

pub fn parse_date(cell: &Cell) -> ScheduleResult<Option<NaiveDate>> {
    let parsed = match cell {
        Cell::Empty => return Ok(None),
        // Time-only cells come through anchored on the Excel epoch
        Cell::DateTime(dt) if dt.date().year() >= 1900 => Some(dt.date()),
        Cell::DateTime(_) => None,
        Cell::Number(n) => date_from_serial(*n),
        Cell::Text(s) if s.trim().is_empty() => return Ok(None),
        Cell::Text(s) => parse_date_text(s),
    };
    
    parsed
        .map(Some)
        .ok_or_else(|| unparseable(Field::Date, cell))
}

fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?
        .checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Accepts `dd.mm.yyyy`, `dd/mm/yy`, `dd-mm-yyyy`, ISO `yyyy-mm-dd` and
/// numeric serials written as text. A trailing time part is ignored.
fn parse_date_text(value: &str) -> Option<NaiveDate> {
    let token = value.split_whitespace().next()?;
    let token = token.split('T').next()?;
    
    let parts: Vec<&str> = token.split(['.', '/', '-']).collect();
    if parts.len() == 1 {
        return token.parse::<f64>().ok().and_then(date_from_serial);
    }
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    
    let numbers: Vec<i32> = parts.iter().filter_map(|p| p.parse().ok()).collect();
    if numbers.len() != 3 {
        return None;
    }
    
    if parts[0].len() == 4 {
        return NaiveDate::from_ymd_opt(numbers[0], numbers[1] as u32, numbers[2] as u32);
    }
    
    let year = match parts[2].len() {
        2 => 2000 + numbers[2],
        4 => numbers[2],
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, numbers[1] as u32, numbers[0] as u32)
}

/// Minutes since midnight, 0..=1439.
pub fn parse_time(cell: &Cell, field: Field) -> ScheduleResult<Option<u32>> {
    let parsed = match cell {
        Cell::Empty => return Ok(None),
        Cell::DateTime(dt) => Some(dt.time().hour() * 60 + dt.time().minute()),
        Cell::Number(n) => time_from_fraction(*n),
        Cell::Text(s) if s.trim().is_empty() => return Ok(None),
        Cell::Text(s) => parse_time_text(s),
    };
    
    parsed
        .map(Some)
        .ok_or_else(|| unparseable(field, cell))
}

/// Fraction of a day; a full date-time serial contributes only its fractional part.
/// Whole numbers of one or more carry no time of day and are rejected.
fn time_from_fraction(value: f64) -> Option<u32> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    if value >= 1.0 && value.fract() == 0.0 {
        return None;
    }
    let fraction = if value >= 1.0 { value.fract() } else { value };
    let minutes = (fraction * MINUTES_PER_DAY as f64).round() as u32;
    Some(minutes % MINUTES_PER_DAY)
}

fn parse_time_text(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    
    // `10.01.2025 08:30` style date-time text
    if let Some((_, time_part)) = trimmed.split_once(' ') {
        if let Some(minutes) = parse_clock(time_part) {
            return Some(minutes);
        }
    }
    
    if let Some(minutes) = parse_clock(trimmed) {
        return Some(minutes);
    }
    
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| *v < 1.0)
        .and_then(time_from_fraction)
}

/// Parses `HH:MM`, `HH.MM` or `HH:MM:SS` into minutes since midnight.
pub fn parse_clock(value: &str) -> Option<u32> {
    let value = value.trim();
    let mut parts = value.split([':', '.']);
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = parts.next()?.trim().parse().ok()?;
    
    if let Some(seconds) = parts.next() {
        let seconds: u32 = seconds.trim().parse().ok()?;
        if seconds > 59 {
            return None;
        }
    }
    if parts.next().is_some() {
        return None;
    }
    
    // 24:00 closes a day and reads as midnight
    if hours == 24 && minutes == 0 {
        return Some(0);
    }
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Locale-flexible number.
///
/// With both separators present the last one is the decimal separator. A lone
/// comma is a decimal comma. A lone dot is a thousands separator when it is
/// repeated or followed by exactly three digits, and a decimal point otherwise.
pub fn parse_number(cell: &Cell) -> ScheduleResult<Option<f64>> {
    let parsed = match cell {
        Cell::Empty => return Ok(None),
        Cell::Number(n) => Some(*n),
        Cell::DateTime(_) => None,
        Cell::Text(s) if s.trim().is_empty() => return Ok(None),
        Cell::Text(s) => parse_number_text(s),
    };
    
    parsed
        .filter(|n| n.is_finite())
        .map(Some)
        .ok_or_else(|| unparseable(Field::Capacity, cell))
}

fn parse_number_text(value: &str) -> Option<f64> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    
    let normalized = match (compact.rfind('.'), compact.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (None, Some(_)) => {
            if compact.matches(',').count() > 1 {
                compact.replace(',', "")
            } else {
                compact.replace(',', ".")
            }
        }
        (Some(dot), None) => {
            let decimals = compact.len() - dot - 1;
            if compact.matches('.').count() > 1 || decimals == 3 {
                compact.replace('.', "")
            } else {
                compact
            }
        }
        (None, None) => compact,
    };
    
    normalized.parse().ok()
}
