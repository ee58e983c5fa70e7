//! Read/write the daily history JSON file.
//!
//! Schema:
//!
//! ```json
//! {
//!   "daily_hdd_values": { "2024-01-15": 6.5 },
//!   "daily_cdd_values": { "2024-07-02": 3.1 }
//! }
//! ```
//!
//! Older files stored heating values under `daily_values`; those are still read.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::Mode;
use crate::error::AppError;
use crate::period::DailyHistory;

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default, alias = "daily_values")]
    daily_hdd_values: BTreeMap<NaiveDate, f64>,
    #[serde(default)]
    daily_cdd_values: BTreeMap<NaiveDate, f64>,
}

/// Load the history file.
///
/// A missing file is an empty history. An unreadable or corrupt file is moved
/// aside to `<name>.corrupt` and also treated as empty, so the next save cannot
/// overwrite the stored days.
pub fn load_history(path: &Path) -> DailyHistory {
    if !path.exists() {
        debug!("No stored data found at {}, starting with empty history", path.display());
        return DailyHistory::new();
    }

    let parsed = File::open(path)
        .map_err(|e| e.to_string())
        .and_then(|file| serde_json::from_reader::<_, HistoryFile>(file).map_err(|e| e.to_string()));

    match parsed {
        Ok(stored) => {
            let history = DailyHistory::from_maps(stored.daily_hdd_values, stored.daily_cdd_values);
            info!(
                "Loaded {} HDD and {} CDD daily values from storage",
                history.len(Mode::Heating),
                history.len(Mode::Cooling)
            );
            history
        }
        Err(e) => {
            let aside = corrupt_path(path);
            match std::fs::rename(path, &aside) {
                Ok(()) => warn!(
                    "Error loading stored data: {e}. Moved it to {} and starting with empty history.",
                    aside.display()
                ),
                Err(rename_err) => warn!(
                    "Error loading stored data: {e}. Could not move it aside ({rename_err}); \
                     it will be replaced on the next save."
                ),
            }
            DailyHistory::new()
        }
    }
}

/// `history.json` -> `history.json.corrupt`.
pub fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

/// Write the history file (pretty-printed).
pub fn save_history(path: &Path, history: &DailyHistory) -> Result<(), AppError> {
    let stored = HistoryFile {
        daily_hdd_values: history.values(Mode::Heating).clone(),
        daily_cdd_values: history.values(Mode::Cooling).clone(),
    };

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create history '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &stored)
        .map_err(|e| AppError::new(2, format!("Failed to write history JSON: {e}")))?;

    debug!(
        "Saved {} HDD and {} CDD daily values to storage",
        history.len(Mode::Heating),
        history.len(Mode::Cooling)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("degree_days_{name}_{}.json", std::process::id()))
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn save_then_load_keeps_both_modes() {
        let path = temp_path("roundtrip");
        let mut history = DailyHistory::new();
        history.record(Mode::Heating, d(14), 6.5);
        history.record(Mode::Cooling, d(14), 0.2);

        save_history(&path, &history).unwrap();
        let loaded = load_history(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, history);
    }

    #[test]
    fn legacy_key_is_read_as_heating() {
        let path = temp_path("legacy");
        std::fs::write(&path, r#"{"daily_values": {"2024-01-13": 4.2}}"#).unwrap();
        let loaded = load_history(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.get(Mode::Heating, d(13)), Some(4.2));
        assert_eq!(loaded.len(Mode::Cooling), 0);
    }

    #[test]
    fn missing_or_corrupt_file_is_empty() {
        assert!(load_history(&temp_path("does_not_exist")).is_empty());

        let path = temp_path("corrupt");
        std::fs::write(&path, "{ not json").unwrap();
        let loaded = load_history(&path);
        assert!(loaded.is_empty());

        // The unreadable file is kept next to the original for recovery.
        let aside = corrupt_path(&path);
        assert!(!path.exists());
        assert_eq!(std::fs::read_to_string(&aside).unwrap(), "{ not json");

        let mut fresh = DailyHistory::new();
        fresh.record(Mode::Heating, d(15), 1.0);
        save_history(&path, &fresh).unwrap();
        assert_eq!(std::fs::read_to_string(&aside).unwrap(), "{ not json");

        std::fs::remove_file(&path).ok();
        std::fs::remove_file(&aside).ok();
    }
}
