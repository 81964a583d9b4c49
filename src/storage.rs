//! Persistence of reports and per-site snapshot history

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use site_pulse_core::{MetricSnapshot, Report};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores assembled reports and answers history queries
pub trait Repository: Send + Sync {
    /// Persist a report; either all of it is stored or none of it
    fn save(&self, report: &Report) -> Result<()>;

    /// Up to `limit` snapshots of `site_id`, newest first
    fn load_history(&self, site_id: &str, limit: usize) -> Result<Vec<MetricSnapshot>>;
}

/// On-disk document, oldest entries first
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryDocument {
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reports: Vec<Report>,
    /// Snapshots keyed by site id
    #[serde(default)]
    pub snapshots: BTreeMap<String, Vec<MetricSnapshot>>,
}

impl HistoryDocument {
    /// Append a report and the snapshots it carries
    pub fn add_report(&mut self, report: &Report, max_items: Option<usize>) {
        self.reports.push(report.clone());
        trim(&mut self.reports, max_items);

        for snapshot in std::iter::once(&report.target_snapshot).chain(&report.competitor_snapshots) {
            let entries = self.snapshots.entry(snapshot.site_id.clone()).or_default();
            entries.push(snapshot.clone());
            trim(entries, max_items);
        }

        self.last_update = Some(report.generated_at);
    }
}

fn trim<T>(entries: &mut Vec<T>, max_items: Option<usize>) {
    if let Some(max) = max_items {
        if entries.len() > max {
            entries.drain(..entries.len() - max);
        }
    }
}

/// Repository backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
    max_items: Option<usize>,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>, max_items: Option<usize>) -> Self {
        Self {
            path: path.into(),
            max_items,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document; a missing file is an empty history
    pub fn load(&self) -> Result<HistoryDocument> {
        if !self.path.exists() {
            return Ok(HistoryDocument::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| Error::FileRead {
            path: self.path.display().to_string(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::Storage(format!("corrupt history file '{}': {}", self.path.display(), e))
        })
    }

    /// The most recently saved report, if any
    pub fn latest_report(&self) -> Result<Option<Report>> {
        Ok(self.load()?.reports.pop())
    }

    /// Write the document through a temporary file and rename it into place
    fn write(&self, document: &HistoryDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("failed to create '{}': {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string_pretty(document)?;
        let tmp_path = self.tmp_path();

        std::fs::write(&tmp_path, content).map_err(|e| {
            Error::Storage(format!("failed to write '{}': {}", tmp_path.display(), e))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            Error::Storage(format!("failed to replace '{}': {}", self.path.display(), e))
        })?;

        debug!("Wrote history to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Repository for JsonFileRepository {
    fn save(&self, report: &Report) -> Result<()> {
        let mut document = self.load()?;
        document.add_report(report, self.max_items);
        self.write(&document)
    }

    fn load_history(&self, site_id: &str, limit: usize) -> Result<Vec<MetricSnapshot>> {
        let document = self.load()?;
        Ok(document
            .snapshots
            .get(site_id)
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use site_pulse_core::ReportAssembler;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn snapshot(site_id: &str, score: u8, at: DateTime<Utc>) -> MetricSnapshot {
        MetricSnapshot {
            site_id: site_id.to_string(),
            captured_at: at,
            performance_score: score,
            lcp_seconds: 2.5,
            cls_score: 0.1,
            opportunities: Vec::new(),
        }
    }

    fn report(day: i64, target_score: u8) -> Report {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap() + Duration::days(day);
        ReportAssembler::default()
            .assemble(
                "me",
                Some(&snapshot("me", target_score, at)),
                &[snapshot("rival", 70, at)],
                &BTreeSet::new(),
                at,
            )
            .unwrap()
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("history.json"), None);

        assert!(repo.load_history("me", 10).unwrap().is_empty());
        assert!(repo.latest_report().unwrap().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("nested/history.json"), None);
        let saved = report(0, 80);

        repo.save(&saved).unwrap();

        assert_eq!(repo.latest_report().unwrap(), Some(saved.clone()));
        let history = repo.load_history("rival", 5).unwrap();
        assert_eq!(history, vec![saved.competitor_snapshots[0].clone()]);
        assert!(!repo.tmp_path().exists());
    }

    #[test]
    fn test_history_is_newest_first_and_limited() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("history.json"), None);

        for (day, score) in [(0, 60), (1, 70), (2, 80)] {
            repo.save(&report(day, score)).unwrap();
        }

        let scores: Vec<u8> = repo
            .load_history("me", 2)
            .unwrap()
            .iter()
            .map(|s| s.performance_score)
            .collect();
        assert_eq!(scores, vec![80, 70]);
        assert!(repo.load_history("unknown", 5).unwrap().is_empty());
    }

    #[test]
    fn test_max_items_trims_oldest() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("history.json"), Some(2));

        for (day, score) in [(0, 60), (1, 70), (2, 80)] {
            repo.save(&report(day, score)).unwrap();
        }

        let document = repo.load().unwrap();
        assert_eq!(document.reports.len(), 2);
        assert_eq!(document.reports[0].target_snapshot.performance_score, 70);
        assert_eq!(document.snapshots["me"].len(), 2);
        assert_eq!(document.last_update, Some(report(2, 80).generated_at));
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();
        let repo = JsonFileRepository::new(&path, None);

        assert!(matches!(repo.save(&report(0, 80)), Err(Error::Storage(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
