use crate::attribution::{action_days, attribute_sessions, DominanceRule};
use crate::models::{ActivityRecord, PhysicianSummary};
use log::debug;
use std::collections::BTreeMap;

/// Folds activity records into one summary per physician and branch.
pub struct PhysicianAggregator {
    rule: DominanceRule,
}

impl PhysicianAggregator {
    pub fn new(rule: DominanceRule) -> Self {
        Self { rule }
    }
    
    /// Summary of records that all belong to one physician.
    pub fn summarize(&self, records: Vec<ActivityRecord>) -> PhysicianSummary {
        let name = most_complete(records.iter().map(|r| r.physician_name.as_str()));
        let branch = most_complete(records.iter().map(|r| r.branch.as_str()));
        let mut summary = PhysicianSummary::new(name, branch);
        
        summary.total_capacity = records.iter().map(|r| r.capacity).sum();
        
        let refs: Vec<&ActivityRecord> = records.iter().collect();
        let credits = attribute_sessions(&refs, &self.rule);
        summary.action_days = action_days(&credits);
        summary.total_work_days = summary.action_days.values().sum();
        summary.raw_records = records;
        
        summary
    }
    
    /// Groups records by `physician_key|branch_key` and summarizes each group.
    /// Groups without any capacity, credit or record are left out.
    pub fn aggregate(&self, records: Vec<ActivityRecord>) -> BTreeMap<String, PhysicianSummary> {
        let mut groups: BTreeMap<String, Vec<ActivityRecord>> = BTreeMap::new();
        for record in records {
            groups.entry(record.identity_key()).or_default().push(record);
        }
        
        let mut physicians = BTreeMap::new();
        for (key, group) in groups {
            let summary = self.summarize(group);
            if summary.is_empty() {
                continue;
            }
            debug!(
                "{} ({}): capacity {}, {} work days",
                summary.name, summary.branch, summary.total_capacity, summary.total_work_days
            );
            physicians.insert(key, summary);
        }
        
        physicians
    }
}

/// Longest display form; the first one wins a tie.
fn most_complete<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut best = "";
    for value in values {
        if value.chars().count() > best.chars().count() {
            best = value;
        }
    }
    best.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    
    fn record(name: &str, branch: &str, day: u32, action: &str, start: u32, end: u32, capacity: f64) -> ActivityRecord {
        ActivityRecord {
            physician_name: name.to_string(),
            physician_key: crate::text::physician_key(name),
            branch: branch.to_string(),
            branch_key: crate::text::branch_key(branch),
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            start_minute: start * 60,
            end_minute: end * 60,
            action: action.to_string(),
            capacity,
        }
    }
    
    #[test]
    fn test_single_row_summary() {
        let aggregator = PhysicianAggregator::new(DominanceRule::default());
        let physicians = aggregator.aggregate(vec![
            record("Ayşe Yılmaz", "Kardiyoloji", 10, "POLIKLINIK", 8, 12, 20.0),
        ]);
        
        let summary = &physicians["ayse yilmaz|kardiyoloji"];
        assert_relative_eq!(summary.total_capacity, 20.0);
        assert_relative_eq!(summary.total_work_days, 0.5);
        assert_relative_eq!(summary.action_days["POLIKLINIK"], 0.5);
        assert_eq!(summary.raw_records.len(), 1);
    }
    
    #[test]
    fn test_capacity_independent_of_attribution() {
        let aggregator = PhysicianAggregator::new(DominanceRule::default());
        let summary = aggregator.summarize(vec![
            record("Ali Can", "Nöroloji", 10, "POLIKLINIK", 8, 12, 15.0),
            record("Ali Can", "Nöroloji", 10, "AMELIYAT", 8, 9, 5.0),
            record("Ali Can", "Nöroloji", 11, "IZIN", 12, 12, 2.5),
        ]);
        
        assert_relative_eq!(summary.total_capacity, 22.5);
        assert_relative_eq!(summary.total_work_days, 0.5);
    }
    
    #[test]
    fn test_work_days_conserved() {
        let aggregator = PhysicianAggregator::new(DominanceRule::default());
        let mut records = Vec::new();
        for day in 1..=20 {
            records.push(record("Ali Can", "Nöroloji", day, "POLIKLINIK", 8, 12, 10.0));
            if day % 3 == 0 {
                records.push(record("Ali Can", "Nöroloji", day, "AMELIYAT", 13, 17, 0.0));
            }
            if day % 4 == 0 {
                records.push(record("Ali Can", "Nöroloji", day, "VIZIT", 13, 15, 0.0));
            }
        }
        
        let summary = aggregator.summarize(records);
        let sum: f64 = summary.action_days.values().sum();
        assert_relative_eq!(summary.total_work_days, sum);
        for days in summary.action_days.values() {
            assert!(*days >= 0.0);
            assert_relative_eq!((days * 2.0).fract(), 0.0);
        }
    }
    
    #[test]
    fn test_grouping_by_normalized_identity() {
        let aggregator = PhysicianAggregator::new(DominanceRule::default());
        let physicians = aggregator.aggregate(vec![
            record("AYŞE YILMAZ", "KARDİYOLOJİ", 10, "POLIKLINIK", 8, 12, 10.0),
            record("Dr. Ayşe Yılmaz", "Kardiyoloji", 11, "POLIKLINIK", 8, 12, 10.0),
            record("Ayşe Yılmaz", "Dahiliye", 12, "POLIKLINIK", 8, 12, 10.0),
        ]);
        
        assert_eq!(physicians.len(), 2);
        let cardiology = &physicians["ayse yilmaz|kardiyoloji"];
        assert_eq!(cardiology.name, "Dr. Ayşe Yılmaz");
        assert_relative_eq!(cardiology.total_capacity, 20.0);
        assert_relative_eq!(cardiology.total_work_days, 1.0);
    }
    
    #[test]
    fn test_empty_input() {
        let aggregator = PhysicianAggregator::new(DominanceRule::default());
        assert!(aggregator.aggregate(Vec::new()).is_empty());
        let summary = aggregator.summarize(Vec::new());
        assert_eq!(summary.total_capacity, 0.0);
        assert!(summary.is_empty());
    }
}
