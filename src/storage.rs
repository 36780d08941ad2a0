//! Optional persistence adapter for elapsed-time totals. The tracking core never
//! performs IO on its own behalf; an integrator saves a snapshot at shutdown and
//! feeds it back through [crate::tracker::ApplicationTracker::add_seeded] on the
//! next start.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::tracker::ApplicationTracker;

/// One application's persisted total. Sub-second precision is deliberately dropped:
/// totals are accrued on a once-a-minute tick, so whole seconds are plenty.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElapsedRecord {
    pub name: String,
    pub elapsed_secs: i64,
    pub category: String,
}

/// Snapshots every known application, tracked and untracked alike.
pub fn snapshot(tracker: &ApplicationTracker) -> Vec<ElapsedRecord> {
    let mut records: Vec<_> = tracker
        .applications()
        .map(|(name, app)| ElapsedRecord {
            name: name.to_owned(),
            elapsed_secs: app.elapsed().num_seconds(),
            category: app.category().name().to_string(),
        })
        .collect();
    records.sort_by(|a, b| a.name.cmp(&b.name));
    records
}

pub fn save_records(path: &Path, records: &[ElapsedRecord]) -> Result<()> {
    let serialized = serde_json::to_string_pretty(records)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write elapsed records to {path:?}"))
}

/// Loads a snapshot as a name-to-elapsed map, ready for seeding. A missing file is
/// an empty history, not an error.
pub fn load_elapsed(path: &Path) -> Result<HashMap<String, TimeDelta>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read elapsed records from {path:?}"))?;
    let records: Vec<ElapsedRecord> = serde_json::from_str(&raw)?;
    Ok(records
        .into_iter()
        .map(|r| (r.name, TimeDelta::seconds(r.elapsed_secs)))
        .collect())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::TimeDelta;
    use tempfile::tempdir;

    use super::{load_elapsed, save_records, ElapsedRecord};

    #[test]
    fn save_and_reload_elapsed_totals() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("elapsed.json");

        save_records(
            &path,
            &[
                ElapsedRecord {
                    name: "iperf3".to_owned(),
                    elapsed_secs: 95,
                    category: "networking".to_owned(),
                },
                ElapsedRecord {
                    name: "nvim".to_owned(),
                    elapsed_secs: 3600,
                    category: "uncategorized".to_owned(),
                },
            ],
        )?;

        let loaded = load_elapsed(&path)?;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["iperf3"], TimeDelta::seconds(95));
        assert_eq!(loaded["nvim"], TimeDelta::seconds(3600));
        Ok(())
    }

    #[test]
    fn missing_file_means_empty_history() -> Result<()> {
        let dir = tempdir()?;
        let loaded = load_elapsed(&dir.path().join("nothing-here.json"))?;
        assert!(loaded.is_empty());
        Ok(())
    }
}
