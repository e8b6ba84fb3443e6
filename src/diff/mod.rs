//! Version diff engine.
//!
//! Physicians are matched between two versions by normalized name and
//! branch. Every key present in either version is reported, with a missing
//! side counting as zero.

pub mod loader;

use crate::config::{DiffConfig, DriverMode};
use crate::models::ScheduleVersion;
use crate::text::{branch_key, identity_key};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use loader::{compare_stored, load_pair, ComparisonRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    CapacityOnly,
    ActionMixOnly,
    Both,
    None,
}

impl ChangeType {
    fn classify(capacity_changed: bool, actions_changed: bool) -> Self {
        match (capacity_changed, actions_changed) {
            (true, true) => ChangeType::Both,
            (true, false) => ChangeType::CapacityOnly,
            (false, true) => ChangeType::ActionMixOnly,
            (false, false) => ChangeType::None,
        }
    }
    
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::CapacityOnly => "capacity_only",
            ChangeType::ActionMixOnly => "action_mix_only",
            ChangeType::Both => "both",
            ChangeType::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicianDelta {
    pub name: String,
    pub branch: String,
    pub baseline_capacity: f64,
    pub updated_capacity: f64,
    pub capacity_delta: f64,
    pub action_deltas: BTreeMap<String, f64>,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDelta {
    pub name: String,
    pub delta: f64,
    pub share_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub name: String,
    pub branch: String,
    pub delta: f64,
    pub share_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub baseline_label: String,
    pub updated_label: String,
    pub per_physician_deltas: Vec<PhysicianDelta>,
    pub top_branches: Vec<BranchDelta>,
    pub top_drivers: Vec<Driver>,
    pub total_baseline_capacity: f64,
    pub total_updated_capacity: f64,
}

impl ComparisonResult {
    pub fn total_delta(&self) -> f64 {
        self.total_updated_capacity - self.total_baseline_capacity
    }
    
    pub fn find(&self, name: &str, branch: &str) -> Option<&PhysicianDelta> {
        let key = identity_key(name, branch);
        self.per_physician_deltas
            .iter()
            .find(|delta| identity_key(&delta.name, &delta.branch) == key)
    }
}

/// One version's view of a physician, merged over summaries sharing a key.
#[derive(Debug, Default)]
struct Side<'a> {
    name: &'a str,
    branch: &'a str,
    capacity: f64,
    action_days: BTreeMap<&'a str, f64>,
}

fn index_version<'a>(version: &'a ScheduleVersion, branch_filter: Option<&str>) -> BTreeMap<String, Side<'a>> {
    let mut sides: BTreeMap<String, Side<'a>> = BTreeMap::new();
    
    for summary in version.physicians.values() {
        if let Some(filter) = branch_filter {
            if branch_key(&summary.branch) != filter {
                continue;
            }
        }
        
        let side = sides.entry(identity_key(&summary.name, &summary.branch)).or_default();
        if side.name.is_empty() {
            side.name = &summary.name;
            side.branch = &summary.branch;
        }
        side.capacity += summary.total_capacity;
        for (action, days) in &summary.action_days {
            *side.action_days.entry(action.as_str()).or_insert(0.0) += days;
        }
    }
    
    sides
}

fn percent_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value.abs() / total * 100.0
    } else {
        0.0
    }
}

/// Compares two versions. Returns `None` when either version is missing.
pub fn compare_versions(
    baseline: Option<&ScheduleVersion>,
    updated: Option<&ScheduleVersion>,
    branch_filter: Option<&str>,
    config: &DiffConfig,
) -> Option<ComparisonResult> {
    let (baseline, updated) = (baseline?, updated?);
    
    let filter = branch_filter
        .map(branch_key)
        .filter(|key| !key.is_empty());
    let before = index_version(baseline, filter.as_deref());
    let after = index_version(updated, filter.as_deref());
    
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    let empty = Side::default();
    
    let mut total_baseline_capacity = 0.0;
    let mut total_updated_capacity = 0.0;
    let mut deltas = Vec::new();
    
    for key in keys {
        let old = before.get(key).unwrap_or(&empty);
        let new = after.get(key).unwrap_or(&empty);
        total_baseline_capacity += old.capacity;
        total_updated_capacity += new.capacity;
        
        let capacity_delta = new.capacity - old.capacity;
        
        let actions: BTreeSet<&str> = old.action_days.keys().chain(new.action_days.keys()).copied().collect();
        let action_deltas: BTreeMap<String, f64> = actions
            .into_iter()
            .map(|action| {
                let delta = new.action_days.get(action).copied().unwrap_or(0.0)
                    - old.action_days.get(action).copied().unwrap_or(0.0);
                (action.to_string(), delta)
            })
            .filter(|(_, delta)| delta.abs() > config.action_threshold)
            .collect();
        
        let change_type = ChangeType::classify(
            capacity_delta.abs() > config.capacity_threshold,
            !action_deltas.is_empty(),
        );
        if change_type == ChangeType::None && !config.include_unchanged {
            continue;
        }
        
        let display = if new.name.is_empty() { old } else { new };
        deltas.push(PhysicianDelta {
            name: display.name.to_string(),
            branch: display.branch.to_string(),
            baseline_capacity: old.capacity,
            updated_capacity: new.capacity,
            capacity_delta,
            action_deltas,
            change_type,
        });
    }
    
    deltas.sort_by(|a, b| {
        b.capacity_delta
            .abs()
            .total_cmp(&a.capacity_delta.abs())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.branch.cmp(&b.branch))
    });
    
    let top_branches = rank_branches(&deltas, config);
    let top_drivers = rank_drivers(&deltas, config);
    
    Some(ComparisonResult {
        baseline_label: baseline.label.clone(),
        updated_label: updated.label.clone(),
        per_physician_deltas: deltas,
        top_branches,
        top_drivers,
        total_baseline_capacity,
        total_updated_capacity,
    })
}

fn significant(deltas: &[PhysicianDelta]) -> impl Iterator<Item = &PhysicianDelta> {
    deltas.iter().filter(|d| d.change_type != ChangeType::None)
}

/// Capacity change summed per branch, largest absolute change first.
fn rank_branches(deltas: &[PhysicianDelta], config: &DiffConfig) -> Vec<BranchDelta> {
    let mut branches: BTreeMap<String, BranchDelta> = BTreeMap::new();
    for delta in significant(deltas) {
        let entry = branches.entry(branch_key(&delta.branch)).or_insert_with(|| BranchDelta {
            name: delta.branch.clone(),
            delta: 0.0,
            share_percent: 0.0,
        });
        entry.delta += delta.capacity_delta;
    }
    
    let total: f64 = branches.values().map(|b| b.delta.abs()).sum();
    let mut ranked: Vec<BranchDelta> = branches
        .into_values()
        .map(|mut b| {
            b.share_percent = percent_of(b.delta, total);
            b
        })
        .collect();
    
    ranked.sort_by(|a, b| b.delta.abs().total_cmp(&a.delta.abs()).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(config.top_n);
    ranked
}

fn rank_drivers(deltas: &[PhysicianDelta], config: &DiffConfig) -> Vec<Driver> {
    let candidates: Vec<&PhysicianDelta> = significant(deltas)
        .filter(|d| d.capacity_delta.abs() > config.capacity_threshold)
        .filter(|d| config.driver_mode == DriverMode::All || d.capacity_delta < 0.0)
        .collect();
    
    let total: f64 = candidates.iter().map(|d| d.capacity_delta.abs()).sum();
    let mut drivers: Vec<Driver> = candidates
        .into_iter()
        .map(|d| Driver {
            name: d.name.clone(),
            branch: d.branch.clone(),
            delta: d.capacity_delta,
            share_percent: percent_of(d.capacity_delta, total),
        })
        .collect();
    
    drivers.sort_by(|a, b| {
        b.delta
            .abs()
            .total_cmp(&a.delta.abs())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.branch.cmp(&b.branch))
    });
    drivers.truncate(config.top_n);
    drivers
}
