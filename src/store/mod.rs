//! Content-addressed storage of schedule versions.
//!
//! A version is identified by the SHA-256 of its period, label, physician
//! map and diagnostics. The creation timestamp is not part of the id, so
//! storing the same ingestion twice yields the same id.

pub mod file;

use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{IngestDiagnostics, PeriodKey, PhysicianSummary, ScheduleVersion};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use file::FileVersionStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

#[derive(Serialize)]
struct VersionContent<'a> {
    period: &'a PeriodKey,
    label: &'a str,
    physicians: &'a BTreeMap<String, PhysicianSummary>,
    diagnostics: &'a IngestDiagnostics,
}

impl VersionId {
    pub fn for_version(version: &ScheduleVersion) -> ScheduleResult<Self> {
        let content = serde_json::to_vec(&VersionContent {
            period: &version.period,
            label: &version.label,
            physicians: &version.physicians,
            diagnostics: &version.diagnostics,
        })?;
        
        let mut hasher = Sha256::new();
        hasher.update(&content);
        Ok(Self(hex::encode(hasher.finalize())))
    }
    
    pub fn parse(value: &str) -> ScheduleResult<Self> {
        let value = value.trim();
        if value.len() != 64 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ScheduleError::Validation(format!("Not a version id: {}", value)));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }
    
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Listing entry for a stored version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionHeader {
    pub id: VersionId,
    pub label: String,
    pub period: PeriodKey,
    pub created_at: DateTime<Utc>,
    pub source_file_name: String,
    pub physician_count: usize,
}

impl VersionHeader {
    pub fn new(id: VersionId, version: &ScheduleVersion) -> Self {
        Self {
            id,
            label: version.label.clone(),
            period: version.period.clone(),
            created_at: version.created_at,
            source_file_name: version.source_file_name.clone(),
            physician_count: version.physicians.len(),
        }
    }
}

#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Publishes a complete version and returns its id.
    async fn put(&self, version: ScheduleVersion) -> ScheduleResult<VersionId>;
    
    async fn get(&self, id: &VersionId) -> ScheduleResult<Option<Arc<ScheduleVersion>>>;
    
    /// Stored versions, oldest first, optionally restricted to one period.
    async fn list(&self, period: Option<&PeriodKey>) -> ScheduleResult<Vec<VersionHeader>>;
}

fn sort_headers(headers: &mut [VersionHeader]) {
    headers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.label.cmp(&b.label)));
}

#[derive(Default)]
pub struct MemoryVersionStore {
    versions: RwLock<HashMap<VersionId, Arc<ScheduleVersion>>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn put(&self, version: ScheduleVersion) -> ScheduleResult<VersionId> {
        let id = VersionId::for_version(&version)?;
        let mut versions = self.versions.write().await;
        if versions.contains_key(&id) {
            debug!("Version {} already stored", id);
        } else {
            versions.insert(id.clone(), Arc::new(version));
        }
        Ok(id)
    }
    
    async fn get(&self, id: &VersionId) -> ScheduleResult<Option<Arc<ScheduleVersion>>> {
        Ok(self.versions.read().await.get(id).cloned())
    }
    
    async fn list(&self, period: Option<&PeriodKey>) -> ScheduleResult<Vec<VersionHeader>> {
        let versions = self.versions.read().await;
        let mut headers: Vec<VersionHeader> = versions
            .iter()
            .filter(|(_, v)| period.map_or(true, |p| v.period == *p))
            .map(|(id, v)| VersionHeader::new(id.clone(), v))
            .collect();
        sort_headers(&mut headers);
        Ok(headers)
    }
}
