//! Report store backends.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{PivotReport, ReportStore};
use crate::api::logs::log_warning;
use crate::error::ReportResult;

/// Default location of the report list (relative to current dir).
pub const DEFAULT_REPORTS_PATH: &str = ".pivotdesk/reports.json";

/// The whole report list as one pretty-printed JSON array on disk.
///
/// Writes go to a staging file that is then renamed over the list, so a
/// failed write leaves the previous list in place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new() -> Self {
        Self::with_path(DEFAULT_REPORTS_PATH)
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: PathBuf::from(path.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the list is written to before it replaces `path`.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore for JsonFileStore {
    fn read_all(&self) -> Vec<PivotReport> {
        if !self.path.exists() {
            return Vec::new();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                log_warning(format!("Cannot read {}: {}", self.path.display(), e));
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<PivotReport>>(&content) {
            Ok(reports) => reports,
            Err(e) => {
                log_warning(format!("Ignoring corrupt report store {}: {}", self.path.display(), e));
                Vec::new()
            }
        }
    }

    fn write_all(&mut self, reports: &[PivotReport]) -> ReportResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(reports)?;
        let staging = self.staging_path();
        fs::write(&staging, content)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    reports: Vec<PivotReport>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportStore for MemoryStore {
    fn read_all(&self) -> Vec<PivotReport> {
        self.reports.clone()
    }

    fn write_all(&mut self, reports: &[PivotReport]) -> ReportResult<()> {
        self.reports = reports.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::report::ReportConfig;
    use tempfile::tempdir;

    fn names(store: &impl ReportStore) -> Vec<String> {
        store.list().into_iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("reports.json");

        let mut store = JsonFileStore::with_path(&path);
        let a = store.save("first", ReportConfig::default()).unwrap();
        let b = store.save("second", ReportConfig::default()).unwrap();

        let reopened = JsonFileStore::with_path(&path);
        let names: Vec<String> = reopened.list().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(reopened.get(&b.id).unwrap().id, b.id);

        let mut reopened = reopened;
        assert!(reopened.delete(&a.id).unwrap());
        assert_eq!(JsonFileStore::with_path(&path).list().len(), 1);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::with_path(dir.path().join("none.json"));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = JsonFileStore::with_path(&path);
        assert!(store.list().is_empty());

        // next write replaces the corrupt content
        store.save("fresh", ReportConfig::default()).unwrap();
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_saved_config_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.json");
        let config = crate::report::tests::sample_config();

        let mut store = JsonFileStore::with_path(&path);
        let saved = store.save("full", config.clone()).unwrap();
        let loaded = JsonFileStore::with_path(&path).get(&saved.id).unwrap();
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn test_failed_write_keeps_previous_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.json");
        let mut store = JsonFileStore::with_path(&path);
        let kept = store.save("kept", ReportConfig::default()).unwrap();

        // a non-empty directory where the staging file should go
        let staging = dir.path().join("reports.json.tmp");
        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("blocker"), "x").unwrap();

        assert!(matches!(store.save("new", ReportConfig::default()), Err(ReportError::Io(_))));
        assert!(matches!(store.rename(&kept.id, "renamed"), Err(ReportError::Io(_))));
        assert!(matches!(store.delete(&kept.id), Err(ReportError::Io(_))));

        assert_eq!(names(&store), vec!["kept"]);
        assert_eq!(names(&JsonFileStore::with_path(&path)), vec!["kept"]);
    }

    #[test]
    fn test_parent_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        let mut store = JsonFileStore::with_path(blocker.join("reports.json"));
        assert!(matches!(store.save("first", ReportConfig::default()), Err(ReportError::Io(_))));
        assert!(store.list().is_empty());
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
    }

    #[test]
    fn test_write_replaces_staging_leftover() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.json");
        fs::write(dir.path().join("reports.json.tmp"), "stale").unwrap();

        let mut store = JsonFileStore::with_path(&path);
        store.save("fresh", ReportConfig::default()).unwrap();
        assert_eq!(names(&store), vec!["fresh"]);
        assert!(!dir.path().join("reports.json.tmp").exists());
    }
}
