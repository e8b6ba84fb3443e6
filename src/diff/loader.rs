use super::{compare_versions, ComparisonResult};
use crate::config::Config;
use crate::models::ScheduleVersion;
use crate::store::{VersionId, VersionStore};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    pub baseline: VersionId,
    pub updated: VersionId,
    pub branch_filter: Option<String>,
}

/// Fetches one version; a missing, unreadable or slow version is `None`.
async fn fetch(store: &dyn VersionStore, id: &VersionId, timeout: Duration) -> Option<Arc<ScheduleVersion>> {
    match tokio::time::timeout(timeout, store.get(id)).await {
        Ok(Ok(Some(version))) => Some(version),
        Ok(Ok(None)) => {
            warn!("Version {} not found", id);
            None
        }
        Ok(Err(e)) => {
            warn!("Failed to load version {}: {}", id, e);
            None
        }
        Err(_) => {
            warn!("Timed out after {:?} loading version {}", timeout, id);
            None
        }
    }
}

/// Loads baseline and updated concurrently.
pub async fn load_pair(
    store: &dyn VersionStore,
    baseline: &VersionId,
    updated: &VersionId,
    timeout: Duration,
) -> (Option<Arc<ScheduleVersion>>, Option<Arc<ScheduleVersion>>) {
    tokio::join!(fetch(store, baseline, timeout), fetch(store, updated, timeout))
}

/// Loads both versions and diffs them. `None` means there is nothing to show.
pub async fn compare_stored(
    store: &dyn VersionStore,
    request: &ComparisonRequest,
    config: &Config,
) -> Option<ComparisonResult> {
    let timeout = Duration::from_secs(config.store.fetch_timeout_secs);
    let (baseline, updated) = load_pair(store, &request.baseline, &request.updated, timeout).await;
    
    let result = compare_versions(
        baseline.as_deref(),
        updated.as_deref(),
        request.branch_filter.as_deref(),
        &config.diff,
    );
    
    match &result {
        Some(comparison) => info!(
            "Compared '{}' with '{}': {} physicians changed",
            comparison.baseline_label,
            comparison.updated_label,
            comparison.per_physician_deltas.len()
        ),
        None => info!("Comparison incomplete: a version is unavailable"),
    }
    
    result
}
