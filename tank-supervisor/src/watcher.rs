//! Polling catalog-file watcher.
//!
//! Compares the catalog file's mtime on every tick. A change is debounced
//! once (editors often write in stages) and then swapped into the
//! [`ParameterRegistry`]. Failed reloads keep the previous catalog.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::registry::{LoadReport, ParameterRegistry};

/// Delay before re-checking a freshly changed file.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, PartialEq)]
pub enum WatchOutcome {
    Unchanged,
    Reloaded(LoadReport),
    /// The file cannot be stat'ed; the current catalog stays.
    Missing,
    Failed(String),
}

pub struct CatalogWatcher {
    path:       PathBuf,
    last_mtime: Option<SystemTime>,
}

impl CatalogWatcher {
    /// Starts from the file's present mtime, assuming the registry was
    /// already loaded from it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_mtime = get_mtime(&path);
        Self { path, last_mtime }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Has the file changed since the last successful check?
    pub fn changed(&self) -> Option<SystemTime> {
        let current = get_mtime(&self.path)?;
        match self.last_mtime {
            Some(prev) if prev == current => None,
            _ => Some(current),
        }
    }

    /// One poll: reload `registry` if the file changed.
    pub fn check(&mut self, registry: &ParameterRegistry) -> WatchOutcome {
        let Some(current) = get_mtime(&self.path) else {
            if self.last_mtime.take().is_some() {
                tracing::warn!(
                    path = %self.path.display(),
                    "catalog file not accessible, keeping current catalog"
                );
            }
            return WatchOutcome::Missing;
        };

        if self.last_mtime == Some(current) {
            return WatchOutcome::Unchanged;
        }
        self.last_mtime = Some(current);

        match registry.reload_from_file(&self.path) {
            Ok(report) => WatchOutcome::Reloaded(report),
            Err(e) => {
                tracing::error!(error = %e, "catalog hot-reload failed, keeping previous catalog");
                WatchOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Poll `path` every `poll_interval` and hot-reload `registry` on change.
/// Runs until the task is dropped.
pub async fn run_catalog_watcher(
    path: PathBuf,
    registry: Arc<ParameterRegistry>,
    poll_interval: Duration,
) {
    tracing::info!(path = %path.display(), "catalog watcher started");
    let mut watcher = CatalogWatcher::new(path);

    loop {
        tokio::time::sleep(poll_interval).await;

        let Some(seen) = watcher.changed() else {
            if get_mtime(watcher.path()).is_none() {
                watcher.check(&registry);
            }
            continue;
        };

        tokio::time::sleep(DEBOUNCE_DELAY).await;
        if get_mtime(watcher.path()) != Some(seen) {
            // still being written; pick it up next tick
            continue;
        }

        if let WatchOutcome::Reloaded(report) = watcher.check(&registry) {
            tracing::info!(
                loaded = report.loaded.len(),
                rejected = report.rejected.len(),
                "catalog file change applied"
            );
        }
    }
}

fn get_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    const CATALOG: &str = r#"
        [[parameter]]
        id = "ph"
        name = "pH"
        normal_min = 7.0
        normal_max = 8.0
        warning_min = 6.5
        warning_max = 8.5
        danger_min = 6.0
        danger_max = 9.0
    "#;

    fn bump_mtime(path: &Path, secs: u64) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(secs)).unwrap();
    }

    #[test]
    fn unchanged_file_is_not_reloaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{CATALOG}").unwrap();
        let registry = ParameterRegistry::builtin();

        let mut watcher = CatalogWatcher::new(file.path());
        assert_eq!(watcher.check(&registry), WatchOutcome::Unchanged);
        assert_eq!(registry.snapshot().len(), 7);
    }

    #[test]
    fn changed_file_is_swapped_in() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{CATALOG}").unwrap();
        let registry = ParameterRegistry::builtin();
        let mut watcher = CatalogWatcher::new(file.path());

        bump_mtime(file.path(), 10);
        assert!(watcher.changed().is_some());
        match watcher.check(&registry) {
            WatchOutcome::Reloaded(report) => assert_eq!(report.loaded, vec!["ph".to_string()]),
            other => panic!("expected reload, got {other:?}"),
        }
        assert_eq!(registry.snapshot().len(), 1);
        assert_eq!(watcher.check(&registry), WatchOutcome::Unchanged);
    }

    #[test]
    fn broken_file_keeps_previous_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[[parameter]\nthis is not toml").unwrap();
        let registry = ParameterRegistry::builtin();
        let mut watcher = CatalogWatcher::new(file.path());

        bump_mtime(file.path(), 10);
        assert!(matches!(watcher.check(&registry), WatchOutcome::Failed(_)));
        assert_eq!(registry.snapshot().len(), 7);
    }

    #[test]
    fn missing_file_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ParameterRegistry::builtin();
        let mut watcher = CatalogWatcher::new(dir.path().join("catalog.toml"));
        assert_eq!(watcher.check(&registry), WatchOutcome::Missing);
    }
}
