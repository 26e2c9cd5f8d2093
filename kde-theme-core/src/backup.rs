/*!
Backup: capture every catalog location into a new named snapshot.
*/

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::catalog::{categories, CategoryEntry};
use crate::desktop::DesktopEnvironment;
use crate::fsops::{copy_path, remove_path};
use crate::metadata::SnapshotMetadata;
use crate::report::{BackupReport, Warning};
use crate::snapshot::ThemeEngine;
use crate::storage::SnapshotStore;
use crate::Result;

impl<S, D> ThemeEngine<S, D>
where
    S: SnapshotStore,
    D: DesktopEnvironment,
{
    /// Capture the current theme and layout into the snapshot `name`
    ///
    /// The snapshot is built in a hidden staging directory and only appears
    /// under `name`, together with its archive, once everything succeeded.
    /// A failed or cancelled run leaves the store as it was, including any
    /// snapshot it was meant to overwrite.
    ///
    /// Missing sources and per-location copy failures are reported as
    /// warnings. Only failing to stage, write the metadata or build the
    /// archive aborts the run.
    ///
    /// # Errors
    /// * `ThemeError::AlreadyExists` - `name` is taken and `overwrite` is false
    /// * `ThemeError::InvalidName` - `name` is not usable as a directory name
    #[tracing::instrument(level = "info", skip(self), fields(root = %self.settings.backup_root.display()))]
    pub fn backup(&self, name: &str, overwrite: bool) -> Result<BackupReport> {
        let staging = self.store.stage(name, overwrite)?;
        info!("Backing up into {}", staging.display());

        let mut report = BackupReport {
            name: name.to_string(),
            ..Default::default()
        };
        let outcome = self.capture_all(name, &staging, &mut report).and_then(|()| {
            if report.cancelled {
                Ok(None)
            } else {
                self.store.commit(name, &staging, overwrite).map(Some)
            }
        });

        match outcome {
            Ok(Some(archive)) => {
                report.snapshot_dir = Some(self.store.path(name)?);
                report.archive_path = Some(archive);
                info!(
                    "Backup '{}' complete: {} categories, {} warnings",
                    name,
                    report.captured.len(),
                    report.warnings.len()
                );
                Ok(report)
            }
            Ok(None) => {
                warn!("Backup '{}' cancelled, discarding what was captured", name);
                self.store.discard(&staging)?;
                Ok(report)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.discard(&staging) {
                    warn!("Could not discard {}: {}", staging.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    /// Fill `staging` with every category, the theme ID and the metadata
    fn capture_all(&self, name: &str, staging: &Path, report: &mut BackupReport) -> Result<()> {
        let mut skipped = Vec::new();
        for entry in categories() {
            if self.cancel.is_cancelled() {
                warn!("Backup cancelled before '{}'", entry.name);
                report.cancelled = true;
                return Ok(());
            }
            if self.capture_category(entry, staging, &mut report.warnings, &mut skipped) {
                report.captured.push(entry.name.to_string());
            }
        }

        report.theme_id = match self.desktop.current_global_theme() {
            Ok(theme_id) => {
                info!("Active global theme: {}", theme_id);
                theme_id
            }
            Err(e) => {
                report.warnings.push(
                    Warning::ThemeIdUnavailable {
                        error: e.to_string(),
                    }
                    .emit(),
                );
                String::new()
            }
        };

        SnapshotMetadata::new(name, report.theme_id.as_str())
            .with_categories(report.captured.clone())
            .with_skipped(skipped)
            .write_to(staging)
    }

    /// Copy one category's locations; true if anything was captured
    fn capture_category(
        &self,
        entry: &CategoryEntry,
        snapshot_dir: &Path,
        warnings: &mut Vec<Warning>,
        skipped: &mut Vec<PathBuf>,
    ) -> bool {
        let mut captured = false;
        for location in entry.locations {
            let source = location.live_path(&self.settings);
            // a dangling symlink counts as missing
            if !source.exists() {
                warnings.push(
                    Warning::SourceMissing {
                        category: entry.name.to_string(),
                        path: source.clone(),
                    }
                    .emit(),
                );
                skipped.push(source);
                continue;
            }

            let target = location.snapshot_path(snapshot_dir, entry.tag);
            match copy_path(&source, &target) {
                Ok(()) => {
                    debug!("Captured {}", source.display());
                    captured = true;
                }
                Err(e) => {
                    warnings.push(
                        Warning::CopyFailed {
                            category: entry.name.to_string(),
                            path: source.clone(),
                            error: e.to_string(),
                        }
                        .emit(),
                    );
                    // a half-copied tree must not end up in the archive
                    if let Err(e) = remove_path(&target) {
                        debug!("Could not clean up {}: {}", target.display(), e);
                    }
                    skipped.push(source);
                }
            }
        }
        captured
    }
}
