/*!
Restore: write a snapshot's categories back over the live desktop.

A restore runs in a fixed order: resolve the snapshot, check the layout's
widgets, replace the selected locations, switch the global theme, then
refresh the desktop's configuration cache.
*/

use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::catalog::{self, CategoryEntry, CategoryTag, RestoreMode, PLASMOIDS_CATEGORY};
use crate::desktop::DesktopEnvironment;
use crate::fsops::{path_exists, replace_path};
use crate::metadata::read_theme_id;
use crate::report::{RestoreReport, Warning};
use crate::snapshot::ThemeEngine;
use crate::storage::SnapshotStore;
use crate::widgets::{plasmoid_packages, referenced_plugins};
use crate::Result;

impl<S, D> ThemeEngine<S, D>
where
    S: SnapshotStore,
    D: DesktopEnvironment,
{
    /// Restore the snapshot `name` using `mode` to pick categories
    ///
    /// Existing files at each target are replaced, not merged. Everything
    /// that can go wrong after the snapshot is resolved is reported as a
    /// warning in the returned report.
    ///
    /// # Errors
    /// * `ThemeError::NotFound` - no snapshot called `name`; nothing was written
    #[tracing::instrument(level = "info", skip(self), fields(mode = %mode))]
    pub fn restore(&self, name: &str, mode: RestoreMode) -> Result<RestoreReport> {
        let snapshot_dir = self.store.path(name)?;
        info!("Restoring {} from {}", mode, snapshot_dir.display());

        let mut report = RestoreReport::new(name, mode);

        if mode.restores_layout() {
            self.check_widgets(&snapshot_dir, &mut report.warnings);
        }

        for entry in mode.select() {
            if self.cancel.is_cancelled() {
                warn!("Restore cancelled before '{}'", entry.name);
                report.cancelled = true;
                break;
            }
            if self.restore_category(entry, &snapshot_dir, &mut report.warnings) {
                report.restored.push(entry.name.to_string());
            }
        }

        if mode.applies_theme() && !report.cancelled {
            report.applied_theme = self.apply_recorded_theme(&snapshot_dir, &mut report.warnings);
        }

        if !report.restored.is_empty() || report.applied_theme.is_some() {
            if let Err(e) = self.desktop.refresh_caches() {
                report.warnings.push(
                    Warning::CacheRefreshFailed {
                        error: e.to_string(),
                    }
                    .emit(),
                );
            }
        }

        info!(
            "Restore of '{}' finished: {} categories, {} warnings",
            name,
            report.restored.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    /// Replace one category's live locations; true if anything was written
    fn restore_category(
        &self,
        entry: &CategoryEntry,
        snapshot_dir: &Path,
        warnings: &mut Vec<Warning>,
    ) -> bool {
        let mut restored = false;
        for location in entry.locations {
            let source = location.snapshot_path(snapshot_dir, entry.tag);
            if !path_exists(&source) {
                debug!("{} not in snapshot, leaving live copy alone", source.display());
                continue;
            }

            let target = location.live_path(&self.settings);
            match replace_path(&source, &target) {
                Ok(()) => {
                    debug!("Restored {}", target.display());
                    restored = true;
                }
                Err(e) => warnings.push(
                    Warning::CopyFailed {
                        category: entry.name.to_string(),
                        path: target,
                        error: e.to_string(),
                    }
                    .emit(),
                ),
            }
        }
        restored
    }

    /// Warn once per widget the snapshot's layout uses that is not available
    ///
    /// Plasmoid packages carried inside the snapshot count as available since
    /// the layout restore installs them alongside the layout files.
    fn check_widgets(&self, snapshot_dir: &Path, warnings: &mut Vec<Warning>) {
        let layout_root = snapshot_dir.join(CategoryTag::Layout.as_str());
        let referenced = match referenced_plugins(&layout_root) {
            Ok(ids) => ids,
            Err(e) => {
                warnings.push(Warning::WidgetCheckFailed { error: e.to_string() }.emit());
                return;
            }
        };
        if referenced.is_empty() {
            debug!("Layout references no widgets");
            return;
        }

        let mut available = match self.desktop.installed_plasmoids() {
            Ok(ids) => ids,
            Err(e) => {
                warnings.push(Warning::WidgetCheckFailed { error: e.to_string() }.emit());
                return;
            }
        };
        available.extend(bundled_plasmoids(snapshot_dir));

        for plugin in referenced.difference(&available) {
            warnings.push(
                Warning::MissingWidget {
                    plugin: plugin.clone(),
                }
                .emit(),
            );
        }
    }

    /// Switch to the snapshot's recorded global theme if it is installed
    fn apply_recorded_theme(
        &self,
        snapshot_dir: &Path,
        warnings: &mut Vec<Warning>,
    ) -> Option<String> {
        let theme_id = match read_theme_id(snapshot_dir) {
            Ok(Some(theme_id)) => theme_id,
            Ok(None) => {
                warnings.push(Warning::ThemeNotRecorded.emit());
                return None;
            }
            Err(e) => {
                warnings.push(Warning::ThemeIdUnavailable { error: e.to_string() }.emit());
                return None;
            }
        };

        match self.desktop.installed_global_themes() {
            Ok(installed) if installed.contains(&theme_id) => {}
            Ok(_) => {
                warnings.push(Warning::ThemeNotInstalled { theme_id }.emit());
                return None;
            }
            Err(e) => {
                warnings.push(
                    Warning::ThemeCheckFailed {
                        theme_id,
                        error: e.to_string(),
                    }
                    .emit(),
                );
                return None;
            }
        }

        match self.desktop.apply_global_theme(&theme_id) {
            Ok(()) => {
                info!("Applied global theme {}", theme_id);
                Some(theme_id)
            }
            Err(e) => {
                warnings.push(
                    Warning::ThemeApplyFailed {
                        theme_id,
                        error: e.to_string(),
                    }
                    .emit(),
                );
                None
            }
        }
    }
}

/// Plasmoid packages stored in the snapshot's `plasmoids` category
fn bundled_plasmoids(snapshot_dir: &Path) -> BTreeSet<String> {
    let Some(entry) = catalog::find(PLASMOIDS_CATEGORY) else {
        return BTreeSet::new();
    };
    entry
        .locations
        .iter()
        .filter_map(|location| {
            let dir = location.snapshot_path(snapshot_dir, entry.tag);
            plasmoid_packages(&dir)
                .map_err(|e| debug!("Could not scan bundled plasmoids in {}: {}", dir.display(), e))
                .ok()
        })
        .flatten()
        .collect()
}
