//! Half-day session attribution.
//!
//! A physician's day is split into a morning and an afternoon window. Within
//! each window the overlap minutes of every action are summed, and the single
//! dominant action earns half a day of credit.

use crate::config::AttributionConfig;
use crate::models::ActivityRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const HALF_DAY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Session {
    Morning,
    Afternoon,
}

/// Fixed half-open interval `[start_minute, end_minute)` of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub session: Session,
    pub start_minute: u32,
    pub end_minute: u32,
}

pub const MORNING: SessionWindow = SessionWindow {
    session: Session::Morning,
    start_minute: 8 * 60,
    end_minute: 12 * 60,
};

pub const AFTERNOON: SessionWindow = SessionWindow {
    session: Session::Afternoon,
    start_minute: 13 * 60,
    end_minute: 17 * 60,
};

pub const SESSION_WINDOWS: [SessionWindow; 2] = [MORNING, AFTERNOON];

impl SessionWindow {
    pub fn length(&self) -> u32 {
        self.end_minute - self.start_minute
    }
    
    pub fn overlap(&self, start_minute: u32, end_minute: u32) -> u32 {
        let start = self.start_minute.max(start_minute);
        let end = self.end_minute.min(end_minute);
        end.saturating_sub(start)
    }
}

/// Minimum-minutes-or-minimum-share test for a window candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominanceRule {
    pub min_minutes: u32,
    pub min_share: f64,
}

impl Default for DominanceRule {
    fn default() -> Self {
        Self::from(&AttributionConfig::default())
    }
}

impl From<&AttributionConfig> for DominanceRule {
    fn from(config: &AttributionConfig) -> Self {
        Self {
            min_minutes: config.min_minutes,
            min_share: config.min_share,
        }
    }
}

impl DominanceRule {
    pub fn qualifies(&self, minutes: u32, window: &SessionWindow) -> bool {
        if minutes == 0 {
            return false;
        }
        minutes >= self.min_minutes || minutes as f64 / window.length() as f64 >= self.min_share
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalfDayCredit {
    pub date: NaiveDate,
    pub session: Session,
    pub action: String,
}

#[derive(Debug)]
struct Candidate<'a> {
    action: &'a str,
    minutes: u32,
    earliest_start: u32,
}

/// Dominant action of one window among the records of a single day.
///
/// Greatest overlap wins among qualifying actions; ties go to the earliest
/// start, then to the alphabetically first label so the result is stable.
pub fn window_winner(records: &[&ActivityRecord], window: &SessionWindow, rule: &DominanceRule) -> Option<String> {
    let mut candidates: HashMap<&str, Candidate> = HashMap::new();
    
    for record in records {
        let minutes = window.overlap(record.start_minute, record.end_minute);
        if minutes == 0 {
            continue;
        }
        let candidate = candidates.entry(record.action.as_str()).or_insert(Candidate {
            action: record.action.as_str(),
            minutes: 0,
            earliest_start: record.start_minute,
        });
        candidate.minutes += minutes;
        candidate.earliest_start = candidate.earliest_start.min(record.start_minute);
    }
    
    candidates
        .into_values()
        .filter(|c| rule.qualifies(c.minutes, window))
        .min_by(|a, b| {
            b.minutes
                .cmp(&a.minutes)
                .then(a.earliest_start.cmp(&b.earliest_start))
                .then(a.action.cmp(b.action))
        })
        .map(|winner| winner.action.to_string())
}

/// Half-day credits for one physician's records, ordered by date and session.
pub fn attribute_sessions(records: &[&ActivityRecord], rule: &DominanceRule) -> Vec<HalfDayCredit> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&ActivityRecord>> = BTreeMap::new();
    for &record in records {
        by_date.entry(record.date).or_default().push(record);
    }
    
    let mut credits = Vec::new();
    for (date, day_records) in &by_date {
        for window in &SESSION_WINDOWS {
            if let Some(action) = window_winner(day_records, window, rule) {
                credits.push(HalfDayCredit {
                    date: *date,
                    session: window.session,
                    action,
                });
            }
        }
    }
    
    credits
}

/// Day credit per action.
pub fn action_days(credits: &[HalfDayCredit]) -> BTreeMap<String, f64> {
    let mut days = BTreeMap::new();
    for credit in credits {
        *days.entry(credit.action.clone()).or_insert(0.0) += HALF_DAY;
    }
    days
}
