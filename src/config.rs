use serde::{Deserialize, Serialize};
use std::path::Path;
use std::collections::HashMap;
use crate::error::{ScheduleError, ScheduleResult};
use crate::ingest::cells::parse_clock;
use crate::ingest::columns::Field;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ingest: IngestConfig,
    pub attribution: AttributionConfig,
    pub diff: DiffConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub header_scan_rows: usize,      // Rows searched for a header row
    pub min_header_fields: usize,     // Fields a row must match to count as header
    pub default_start: String,        // HH:MM used when the start cell is empty
    pub default_end: String,          // HH:MM used when the end cell is empty
    pub default_action: String,
    pub total_markers: Vec<String>,   // Physician cell values that mark summary rows
    pub extra_synonyms: HashMap<Field, Vec<String>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: 60,
            min_header_fields: 2,
            default_start: "08:00".to_string(),
            default_end: "17:00".to_string(),
            default_action: "BELIRTILMEMIS".to_string(),
            total_markers: vec![
                "toplam".to_string(),
                "genel toplam".to_string(),
                "total".to_string(),
            ],
            extra_synonyms: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub min_minutes: u32,   // Overlap that always qualifies an action
    pub min_share: f64,     // Fraction of the window that qualifies an action
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            min_minutes: 30,
            min_share: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverMode {
    All,
    DecreasesOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub capacity_threshold: f64,
    pub action_threshold: f64,
    pub top_n: usize,
    pub driver_mode: DriverMode,
    pub include_unchanged: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            capacity_threshold: 0.1,
            action_threshold: 0.01,
            top_n: 5,
            driver_mode: DriverMode::All,
            include_unchanged: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub fetch_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { fetch_timeout_secs: 10 }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ScheduleResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
    
    pub fn validate(&self) -> ScheduleResult<()> {
        self.validate_ingest()?;
        
        let attribution = &self.attribution;
        if !(0.0..=1.0).contains(&attribution.min_share) {
            return Err(ScheduleError::InvalidConfig(
                "attribution.min_share must be between 0 and 1".to_string()
            ));
        }
        
        if self.diff.capacity_threshold < 0.0 || self.diff.action_threshold < 0.0 {
            return Err(ScheduleError::InvalidConfig(
                "diff thresholds must not be negative".to_string()
            ));
        }
        
        if self.diff.top_n == 0 {
            return Err(ScheduleError::InvalidConfig(
                "diff.top_n must be at least 1".to_string()
            ));
        }
        
        if self.store.fetch_timeout_secs == 0 {
            return Err(ScheduleError::InvalidConfig(
                "store.fetch_timeout_secs must be positive".to_string()
            ));
        }
        
        Ok(())
    }
    
    fn validate_ingest(&self) -> ScheduleResult<()> {
        let ingest = &self.ingest;
        
        if ingest.header_scan_rows == 0 {
            return Err(ScheduleError::InvalidConfig(
                "ingest.header_scan_rows must be at least 1".to_string()
            ));
        }
        
        if ingest.min_header_fields == 0 {
            return Err(ScheduleError::InvalidConfig(
                "ingest.min_header_fields must be at least 1".to_string()
            ));
        }
        
        for (name, value) in [("default_start", &ingest.default_start), ("default_end", &ingest.default_end)] {
            if parse_clock(value).is_none() {
                return Err(ScheduleError::InvalidConfig(
                    format!("ingest.{} is not a HH:MM time: {}", name, value)
                ));
            }
        }
        
        if ingest.default_action.trim().is_empty() {
            return Err(ScheduleError::InvalidConfig(
                "ingest.default_action must not be empty".to_string()
            ));
        }
        
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"diff": {"top_n": 3}}"#).unwrap();
        assert_eq!(config.diff.top_n, 3);
        assert_eq!(config.diff.capacity_threshold, 0.1);
        assert_eq!(config.attribution.min_minutes, 30);
        assert_eq!(config.ingest.header_scan_rows, 60);
        config.validate().unwrap();
    }
    
    #[test]
    fn test_extra_synonyms_keyed_by_field() {
        let config: Config = serde_json::from_str(
            r#"{"ingest": {"extra_synonyms": {"physician": ["sorumlu"]}}}"#
        ).unwrap();
        assert_eq!(config.ingest.extra_synonyms[&Field::Physician], vec!["sorumlu".to_string()]);
    }
    
    #[test]
    fn test_invalid_default_time_rejected() {
        let mut config = Config::default();
        config.ingest.default_start = "sabah".to_string();
        assert!(matches!(config.validate(), Err(ScheduleError::InvalidConfig(_))));
    }
    
    #[test]
    fn test_invalid_share_rejected() {
        let mut config = Config::default();
        config.attribution.min_share = 1.5;
        assert!(config.validate().is_err());
    }
}
