use super::{sort_headers, VersionHeader, VersionId, VersionStore};
use crate::error::ScheduleResult;
use crate::models::{PeriodKey, ScheduleVersion};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stores each version as `<id>.json` in one directory.
pub struct FileVersionStore {
    root: PathBuf,
}

impl FileVersionStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    
    fn path_for(&self, id: &VersionId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
    
    async fn read_version(path: &Path) -> ScheduleResult<Option<ScheduleVersion>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl VersionStore for FileVersionStore {
    async fn put(&self, version: ScheduleVersion) -> ScheduleResult<VersionId> {
        let id = VersionId::for_version(&version)?;
        let path = self.path_for(&id);
        
        tokio::fs::create_dir_all(&self.root).await?;
        if tokio::fs::try_exists(&path).await? {
            debug!("Version {} already stored at {:?}", id, path);
            return Ok(id);
        }
        
        // Readers never observe a partially written file
        let staging = self.root.join(format!("{}.json.tmp", id));
        let content = serde_json::to_vec_pretty(&version)?;
        tokio::fs::write(&staging, content).await?;
        tokio::fs::rename(&staging, &path).await?;
        
        info!("Stored version '{}' ({}) as {}", version.label, version.period, id);
        Ok(id)
    }
    
    async fn get(&self, id: &VersionId) -> ScheduleResult<Option<Arc<ScheduleVersion>>> {
        Ok(Self::read_version(&self.path_for(id)).await?.map(Arc::new))
    }
    
    async fn list(&self, period: Option<&PeriodKey>) -> ScheduleResult<Vec<VersionHeader>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        
        let mut headers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(stem) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(".json"))
            else {
                continue;
            };
            let Ok(id) = VersionId::parse(stem) else {
                continue;
            };
            
            match Self::read_version(&path).await {
                Ok(Some(version)) => {
                    if period.map_or(true, |p| version.period == *p) {
                        headers.push(VersionHeader::new(id, &version));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring unreadable version file {:?}: {}", path, e),
            }
        }
        
        sort_headers(&mut headers);
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::version;
    
    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVersionStore::new(dir.path());
        
        let original = version("v1", 1, 42.0);
        let id = store.put(original.clone()).await.unwrap();
        assert!(dir.path().join(format!("{}.json", id)).exists());
        assert!(!dir.path().join(format!("{}.json.tmp", id)).exists());
        
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(*loaded, original);
    }
    
    #[tokio::test]
    async fn test_file_store_list_and_dedupe() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVersionStore::new(dir.path());
        
        let first = store.put(version("v1", 1, 42.0)).await.unwrap();
        let repeat = store.put(version("v1", 1, 42.0)).await.unwrap();
        assert_eq!(first, repeat);
        store.put(version("v2", 1, 40.0)).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a version").unwrap();
        
        let headers = store.list(None).await.unwrap();
        assert_eq!(headers.len(), 2);
        let february = PeriodKey::new("H1", 2025, 2).unwrap();
        assert!(store.list(Some(&february)).await.unwrap().is_empty());
    }
    
    #[tokio::test]
    async fn test_file_store_missing_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVersionStore::new(dir.path().join("absent"));
        let id = VersionId::for_version(&version("v1", 1, 1.0)).unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(store.list(None).await.unwrap().is_empty());
    }
}
