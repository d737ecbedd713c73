//! Saved report history.
//!
//! Completed sessions are stored newest-first with a creation-time id.
//! `JsonFileHistory` keeps the whole list in one JSON file and replaces it
//! atomically on every change; `InMemoryHistory` serves tests.

use crate::error::HistoryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One saved research report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedReport {
    /// Creation time in epoch milliseconds, strictly increasing per store.
    pub id: i64,
    pub question: String,
    /// Final report text as produced by the last cycle.
    pub report: String,
    pub timestamp: DateTime<Utc>,
    /// Total session cost, 4 decimal places.
    pub cost: String,
    pub model: String,
}

/// Storage for saved reports.
pub trait ReportHistory: Send + Sync {
    fn save(
        &self,
        question: &str,
        report: &str,
        cost: &str,
        model: &str,
    ) -> Result<SavedReport, HistoryError>;

    /// Every saved report, most recent first.
    fn list(&self) -> Result<Vec<SavedReport>, HistoryError>;

    fn get(&self, id: i64) -> Result<SavedReport, HistoryError> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(HistoryError::NotFound { id })
    }

    fn delete(&self, id: i64) -> Result<(), HistoryError>;
}

/// Build a new entry whose id is the current time, bumped past `newest` so
/// ids never repeat.
fn new_entry(newest: Option<i64>, question: &str, report: &str, cost: &str, model: &str) -> SavedReport {
    let timestamp = Utc::now();
    let now_ms = timestamp.timestamp_millis();
    let id = match newest {
        Some(newest) if newest >= now_ms => newest + 1,
        _ => now_ms,
    };
    SavedReport {
        id,
        question: question.to_string(),
        report: report.to_string(),
        timestamp,
        cost: cost.to_string(),
        model: model.to_string(),
    }
}

fn remove_entry(reports: &mut Vec<SavedReport>, id: i64) -> Result<(), HistoryError> {
    let before = reports.len();
    reports.retain(|r| r.id != id);
    if reports.len() == before {
        return Err(HistoryError::NotFound { id });
    }
    Ok(())
}

/// History persisted as a single JSON array on disk.
pub struct JsonFileHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<SavedReport>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    /// Write to a `.tmp` sibling, then rename over the real file.
    fn store(&self, reports: &[SavedReport]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(reports)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json.as_bytes())?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ReportHistory for JsonFileHistory {
    fn save(
        &self,
        question: &str,
        report: &str,
        cost: &str,
        model: &str,
    ) -> Result<SavedReport, HistoryError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut reports = self.load()?;
        let entry = new_entry(reports.first().map(|r| r.id), question, report, cost, model);
        reports.insert(0, entry.clone());
        self.store(&reports)?;
        tracing::info!(id = entry.id, path = %self.path.display(), "Saved report to history");
        Ok(entry)
    }

    fn list(&self) -> Result<Vec<SavedReport>, HistoryError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load()
    }

    fn delete(&self, id: i64) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut reports = self.load()?;
        remove_entry(&mut reports, id)?;
        self.store(&reports)
    }
}

/// Process-local history for tests.
#[derive(Default)]
pub struct InMemoryHistory {
    reports: Mutex<Vec<SavedReport>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportHistory for InMemoryHistory {
    fn save(
        &self,
        question: &str,
        report: &str,
        cost: &str,
        model: &str,
    ) -> Result<SavedReport, HistoryError> {
        let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        let entry = new_entry(reports.first().map(|r| r.id), question, report, cost, model);
        reports.insert(0, entry.clone());
        Ok(entry)
    }

    fn list(&self) -> Result<Vec<SavedReport>, HistoryError> {
        Ok(self
            .reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn delete(&self, id: i64) -> Result<(), HistoryError> {
        let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        remove_entry(&mut reports, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_newest_first_with_increasing_ids() {
        let history = InMemoryHistory::new();
        let a = history.save("first?", "r1", "0.0100", "gpt-4o").unwrap();
        let b = history.save("second?", "r2", "0.0200", "gpt-4o").unwrap();
        let c = history.save("third?", "r3", "0.0300", "o1").unwrap();
        assert!(a.id < b.id && b.id < c.id);

        let questions: Vec<String> = history.list().unwrap().into_iter().map(|r| r.question).collect();
        assert_eq!(questions, vec!["third?", "second?", "first?"]);
    }

    #[test]
    fn test_delete_by_id() {
        let history = InMemoryHistory::new();
        let a = history.save("q", "r", "0.0000", "m").unwrap();
        history.delete(a.id).unwrap();
        assert!(history.list().unwrap().is_empty());
        assert!(matches!(
            history.delete(a.id),
            Err(HistoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let history = JsonFileHistory::new(&path);
        assert!(history.list().unwrap().is_empty());

        let saved = history
            .save("renewable energy storage", "# Report", "0.0123", "gpt-4o-mini")
            .unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let reopened = JsonFileHistory::new(&path);
        assert_eq!(reopened.get(saved.id).unwrap(), saved);
        assert!(matches!(
            reopened.get(saved.id + 1),
            Err(HistoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_json_file_field_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let history = JsonFileHistory::new(&path);
        history.save("q", "r", "1.5000", "o1").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &raw[0];
        for key in ["id", "question", "report", "timestamp", "cost", "model"] {
            assert!(entry.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        let history = JsonFileHistory::new(&path);
        assert!(matches!(
            history.list(),
            Err(HistoryError::Serialization(_))
        ));
    }
}
