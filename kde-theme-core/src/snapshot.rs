/*!
Theme engine that ties the catalog, the snapshot store and the desktop together.

Backup and restore live in their own modules (`backup.rs`, `restore.rs`) as
further `impl` blocks on [`ThemeEngine`]; this module holds the engine itself,
the cancellation flag and the read-only snapshot queries.
*/

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::compression::TarGzCodec;
use crate::config::Settings;
use crate::desktop::{DesktopEnvironment, PlasmaDesktop};
use crate::metadata::{read_theme_id, SnapshotMetadata};
use crate::storage::{LocalSnapshotStore, SnapshotStore};
use crate::Result;

/// Shared flag used to ask a running backup or restore to stop
///
/// Cloning shares the flag. Once raised, engines finish the category they
/// are copying, skip the remaining categories and the global theme switch,
/// and return a report marked as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of one stored snapshot, as shown by `show` and `list --detailed`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub name: String,
    pub path: PathBuf,
    pub archive: Option<PathBuf>,
    pub archive_size: Option<u64>,
    /// Recorded Global Theme ID, `None` when the snapshot has none
    pub theme_id: Option<String>,
    /// `snapshot.json` contents; absent for snapshots made by older tools
    pub metadata: Option<SnapshotMetadata>,
}

/// Engine for theme and layout snapshots
///
/// Generic over the snapshot store and the desktop adapter so tests can run
/// against a temporary store and a fake desktop.
///
/// # Example
/// ```rust,no_run
/// use kde_theme_core::{create_default_engine, RestoreMode, Settings};
///
/// let engine = create_default_engine(Settings::from_env()?)?;
/// let report = engine.backup("macosfull", false)?;
/// println!("captured {:?}", report.captured);
///
/// let report = engine.restore("macosfull", RestoreMode::All)?;
/// for warning in &report.warnings {
///     eprintln!("{warning}");
/// }
/// # Ok::<(), kde_theme_core::ThemeError>(())
/// ```
pub struct ThemeEngine<S, D>
where
    S: SnapshotStore,
    D: DesktopEnvironment,
{
    pub(crate) store: S,
    pub(crate) desktop: D,
    pub(crate) settings: Settings,
    pub(crate) cancel: CancellationFlag,
}

impl<S, D> ThemeEngine<S, D>
where
    S: SnapshotStore,
    D: DesktopEnvironment,
{
    /// Create an engine over `store` and `desktop`, expanding catalog paths against `settings`
    pub fn new(store: S, desktop: D, settings: Settings) -> Self {
        Self {
            store,
            desktop,
            settings,
            cancel: CancellationFlag::new(),
        }
    }

    /// Use an externally owned cancellation flag (for example one raised by a signal handler)
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Handle that can cancel this engine's running operation
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn desktop(&self) -> &D {
        &self.desktop
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Names of all stored snapshots, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        self.store.list()
    }

    /// Describe a stored snapshot
    pub fn show(&self, name: &str) -> Result<SnapshotSummary> {
        let path = self.store.path(name)?;
        let archive = self.store.archive_path(name);
        let archive_size = archive
            .as_deref()
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| m.len());

        let metadata = match SnapshotMetadata::read_from(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Ignoring unreadable metadata for '{}': {}", name, e);
                None
            }
        };

        Ok(SnapshotSummary {
            name: name.to_string(),
            theme_id: read_theme_id(&path)?,
            path,
            archive,
            archive_size,
            metadata,
        })
    }

    /// Remove a snapshot and its archive
    #[tracing::instrument(level = "info", skip(self))]
    pub fn delete(&self, name: &str) -> Result<()> {
        self.store.delete(name)
    }

    /// Add a snapshot archive (for example one copied from another machine) to the store
    #[tracing::instrument(level = "info", skip(self), fields(archive = %archive.display()))]
    pub fn import(&self, archive: &Path, overwrite: bool) -> Result<String> {
        let name = self.store.import(archive, overwrite)?;
        info!("Snapshot '{}' is ready to restore", name);
        Ok(name)
    }
}

/// Create an engine with the local tar.gz store and the Plasma desktop adapter
///
/// The settings are validated first; the store lives at `settings.backup_root`.
pub fn create_default_engine(
    settings: Settings,
) -> Result<ThemeEngine<LocalSnapshotStore<TarGzCodec>, PlasmaDesktop>> {
    settings.validate()?;
    let store = LocalSnapshotStore::with_codec(
        &settings.backup_root,
        TarGzCodec::with_level(settings.compression_level),
    );
    let desktop = PlasmaDesktop::from_settings(&settings);
    Ok(ThemeEngine::new(store, desktop, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::write_theme_id;
    use crate::ThemeError;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    struct NoDesktop;

    impl DesktopEnvironment for NoDesktop {
        fn current_global_theme(&self) -> Result<String> {
            Err(ThemeError::command("kreadconfig6", "not available in tests"))
        }
        fn installed_global_themes(&self) -> Result<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }
        fn apply_global_theme(&self, _theme_id: &str) -> Result<()> {
            Ok(())
        }
        fn installed_plasmoids(&self) -> Result<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }
        fn refresh_caches(&self) -> Result<()> {
            Ok(())
        }
    }

    fn engine_in(tmp: &TempDir) -> ThemeEngine<LocalSnapshotStore, NoDesktop> {
        let settings = Settings::with_home(tmp.path());
        ThemeEngine::new(
            LocalSnapshotStore::new(&settings.backup_root),
            NoDesktop,
            settings,
        )
    }

    #[test]
    fn test_cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_engine_uses_provided_flag() {
        let tmp = TempDir::new().unwrap();
        let flag = CancellationFlag::new();
        let engine = engine_in(&tmp).with_cancellation(flag.clone());
        flag.cancel();
        assert!(engine.cancellation().is_cancelled());
    }

    #[test]
    fn test_show_reports_theme_and_archive() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);

        let staging = engine.store().stage("nord", false).unwrap();
        write_theme_id(&staging, "com.github.nord.desktop").unwrap();
        engine.store().commit("nord", &staging, false).unwrap();

        let summary = engine.show("nord").unwrap();
        assert_eq!(summary.theme_id.as_deref(), Some("com.github.nord.desktop"));
        assert!(summary.archive.is_some());
        assert!(summary.archive_size.unwrap() > 0);
        assert!(summary.metadata.is_none());
    }

    #[test]
    fn test_show_and_delete_unknown() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);
        assert!(matches!(engine.show("ghost"), Err(ThemeError::NotFound(_))));
        assert!(matches!(engine.delete("ghost"), Err(ThemeError::NotFound(_))));
    }

    #[test]
    fn test_create_default_engine_validates_settings() {
        let settings = Settings::with_home("/home/alice").with_backup_root("relative");
        assert!(create_default_engine(settings).is_err());

        let engine = create_default_engine(Settings::with_home("/home/alice")).unwrap();
        assert_eq!(
            engine.store().root(),
            Path::new("/home/alice/kde-theme-backups")
        );
    }
}
