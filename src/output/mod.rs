use crate::diff::{ChangeType, ComparisonResult};
use crate::error::ScheduleResult;
use crate::models::ScheduleVersion;
use std::path::Path;
use std::fs::File;
use log::info;

pub fn save_comparison<P: AsRef<Path>>(result: &ComparisonResult, output_dir: P) -> ScheduleResult<()> {
    let output_path = output_dir.as_ref();
    
    save_physician_deltas(result, &output_path.join("physician_deltas.csv"))?;
    save_top_branches(result, &output_path.join("top_branches.csv"))?;
    save_top_drivers(result, &output_path.join("top_drivers.csv"))?;
    
    let file = File::create(output_path.join("comparison.json"))?;
    serde_json::to_writer_pretty(file, result)?;
    
    info!("Comparison saved to {:?}", output_path);
    Ok(())
}

fn save_physician_deltas<P: AsRef<Path>>(result: &ComparisonResult, path: P) -> ScheduleResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    
    writer.write_record(&[
        "PHYSICIAN", "BRANCH", "BASELINE_CAPACITY", "UPDATED_CAPACITY",
        "CAPACITY_DELTA", "ACTION_DELTAS", "CHANGE_TYPE",
    ])?;
    
    for delta in &result.per_physician_deltas {
        let actions = delta
            .action_deltas
            .iter()
            .map(|(action, days)| format!("{}:{:+}", action, days))
            .collect::<Vec<_>>()
            .join(";");
        
        writer.write_record(&[
            delta.name.clone(),
            delta.branch.clone(),
            delta.baseline_capacity.to_string(),
            delta.updated_capacity.to_string(),
            delta.capacity_delta.to_string(),
            actions,
            delta.change_type.as_str().to_string(),
        ])?;
    }
    
    writer.flush()?;
    Ok(())
}

fn save_top_branches<P: AsRef<Path>>(result: &ComparisonResult, path: P) -> ScheduleResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["BRANCH", "DELTA", "SHARE_PERCENT"])?;
    
    for branch in &result.top_branches {
        writer.write_record(&[
            branch.name.clone(),
            branch.delta.to_string(),
            format!("{:.1}", branch.share_percent),
        ])?;
    }
    
    writer.flush()?;
    Ok(())
}

fn save_top_drivers<P: AsRef<Path>>(result: &ComparisonResult, path: P) -> ScheduleResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["PHYSICIAN", "BRANCH", "DELTA", "SHARE_PERCENT"])?;
    
    for driver in &result.top_drivers {
        writer.write_record(&[
            driver.name.clone(),
            driver.branch.clone(),
            driver.delta.to_string(),
            format!("{:.1}", driver.share_percent),
        ])?;
    }
    
    writer.flush()?;
    Ok(())
}

/// One row per physician with capacity, work days and day credit per action.
pub fn save_version_summary<P: AsRef<Path>>(version: &ScheduleVersion, output_dir: P) -> ScheduleResult<()> {
    let path = output_dir.as_ref().join("physicians.csv");
    let mut writer = csv::Writer::from_path(&path)?;
    
    // Every action seen in the version becomes a column
    let mut actions: Vec<&String> = version
        .physicians
        .values()
        .flat_map(|p| p.action_days.keys())
        .collect();
    actions.sort();
    actions.dedup();
    
    let mut header = vec![
        "PHYSICIAN".to_string(),
        "BRANCH".to_string(),
        "TOTAL_CAPACITY".to_string(),
        "TOTAL_WORK_DAYS".to_string(),
    ];
    header.extend(actions.iter().map(|a| a.to_string()));
    writer.write_record(&header)?;
    
    for summary in version.physicians.values() {
        let mut record = vec![
            summary.name.clone(),
            summary.branch.clone(),
            summary.total_capacity.to_string(),
            summary.total_work_days.to_string(),
        ];
        for action in &actions {
            let days = summary.action_days.get(*action).unwrap_or(&0.0);
            record.push(days.to_string());
        }
        writer.write_record(&record)?;
    }
    
    writer.flush()?;
    info!("Summary of '{}' saved to {:?}", version.label, path);
    Ok(())
}

/// Generate a markdown report of a comparison
pub fn generate_report<P: AsRef<Path>>(result: &ComparisonResult, output_dir: P) -> ScheduleResult<()> {
    let report_path = output_dir.as_ref().join("comparison_report.md");
    
    let branch_lines = if result.top_branches.is_empty() {
        "- No branch-level capacity change\n".to_string()
    } else {
        result
            .top_branches
            .iter()
            .map(|b| format!("- **{}**: {:+.1} ({:.1}%)\n", b.name, b.delta, b.share_percent))
            .collect()
    };
    
    let driver_lines = if result.top_drivers.is_empty() {
        "- No physician-level capacity change\n".to_string()
    } else {
        result
            .top_drivers
            .iter()
            .map(|d| format!("- **{}** ({}): {:+.1} ({:.1}%)\n", d.name, d.branch, d.delta, d.share_percent))
            .collect()
    };
    
    let changed = |kind: ChangeType| {
        result.per_physician_deltas.iter().filter(|d| d.change_type == kind).count()
    };
    
    let report_content = format!(
        r#"# Schedule Comparison Report

## Versions
- **Baseline**: {}
- **Updated**: {}

## Capacity
- Baseline total: {:.1}
- Updated total: {:.1}
- Change: {:+.1}

## Changed Physicians
- Capacity only: {}
- Activity mix only: {}
- Both: {}

## Top Branches
{}
## Top Drivers
{}
## Files Generated
- `physician_deltas.csv`: Per-physician capacity and activity changes
- `top_branches.csv`: Branches with the largest capacity change
- `top_drivers.csv`: Physicians with the largest capacity change
- `comparison.json`: Complete comparison result
"#,
        result.baseline_label,
        result.updated_label,
        result.total_baseline_capacity,
        result.total_updated_capacity,
        result.total_delta(),
        changed(ChangeType::CapacityOnly),
        changed(ChangeType::ActionMixOnly),
        changed(ChangeType::Both),
        branch_lines,
        driver_lines,
    );
    
    std::fs::write(report_path, report_content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiffConfig;
    use crate::diff::compare_versions;
    use crate::diff::tests::{summary, version};
    
    fn comparison() -> ComparisonResult {
        let baseline = version("aralik", vec![
            summary("Ali Can", "Nöroloji", 40.0, &[("POLIKLINIK", 2.0)]),
            summary("Ayşe Yılmaz", "Kardiyoloji", 100.0, &[]),
        ]);
        let updated = version("ocak", vec![
            summary("Ali Can", "Nöroloji", 40.0, &[("POLIKLINIK", 1.0), ("AMELIYAT", 1.0)]),
            summary("Ayşe Yılmaz", "Kardiyoloji", 80.0, &[]),
        ]);
        compare_versions(Some(&baseline), Some(&updated), None, &DiffConfig::default()).unwrap()
    }
    
    #[test]
    fn test_save_comparison_files() {
        let dir = tempfile::tempdir().unwrap();
        save_comparison(&comparison(), dir.path()).unwrap();
        
        let deltas = std::fs::read_to_string(dir.path().join("physician_deltas.csv")).unwrap();
        let lines: Vec<&str> = deltas.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Ayşe Yılmaz,Kardiyoloji,100,80,-20"));
        assert!(lines[2].contains("AMELIYAT:+1;POLIKLINIK:-1"));
        assert!(lines[2].ends_with("action_mix_only"));
        
        let json = std::fs::read_to_string(dir.path().join("comparison.json")).unwrap();
        let parsed: ComparisonResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, comparison());
    }
    
    #[test]
    fn test_report_lists_drivers() {
        let dir = tempfile::tempdir().unwrap();
        generate_report(&comparison(), dir.path()).unwrap();
        let report = std::fs::read_to_string(dir.path().join("comparison_report.md")).unwrap();
        assert!(report.contains("- Change: -20.0"));
        assert!(report.contains("**Ayşe Yılmaz** (Kardiyoloji): -20.0 (100.0%)"));
    }
    
    #[test]
    fn test_version_summary_columns() {
        let dir = tempfile::tempdir().unwrap();
        let v = version("ocak", vec![
            summary("Ali Can", "Nöroloji", 40.0, &[("POLIKLINIK", 1.0), ("AMELIYAT", 1.0)]),
            summary("Ayşe Yılmaz", "Kardiyoloji", 80.0, &[("VIZIT", 0.5)]),
        ]);
        save_version_summary(&v, dir.path()).unwrap();
        
        let content = std::fs::read_to_string(dir.path().join("physicians.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "PHYSICIAN,BRANCH,TOTAL_CAPACITY,TOTAL_WORK_DAYS,AMELIYAT,POLIKLINIK,VIZIT");
        assert_eq!(lines[1], "Ali Can,Nöroloji,40,2,1,1,0");
    }
}
