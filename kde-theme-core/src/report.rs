/*!
Structured results of backup and restore runs.

Every non-fatal condition is logged as it happens and also collected here, so a
front-end can render warnings without scraping log output.
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

use crate::catalog::RestoreMode;

/// A non-fatal condition encountered during backup or restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A catalog location does not exist on this system and was skipped
    SourceMissing { category: String, path: PathBuf },
    /// Copying one location failed; the rest of the run continued
    CopyFailed {
        category: String,
        path: PathBuf,
        error: String,
    },
    /// The global theme ID could not be queried or read back from the snapshot
    ThemeIdUnavailable { error: String },
    /// The snapshot records no global theme, so none was applied
    ThemeNotRecorded,
    /// The recorded global theme is not installed on this system
    ThemeNotInstalled { theme_id: String },
    /// Installed themes could not be enumerated, so the theme was not applied
    ThemeCheckFailed { theme_id: String, error: String },
    /// The theme-switch utility failed
    ThemeApplyFailed { theme_id: String, error: String },
    /// The layout references a plasmoid that is not installed
    MissingWidget { plugin: String },
    /// Installed plasmoids could not be enumerated, so the layout was not checked
    WidgetCheckFailed { error: String },
    /// The desktop configuration cache refresh failed
    CacheRefreshFailed { error: String },
}

impl Warning {
    /// Log the warning through `tracing` and return it for collection
    pub fn emit(self) -> Self {
        warn!("{}", self);
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SourceMissing { category, path } => {
                write!(f, "[{category}] skipping {}: not present", path.display())
            }
            Warning::CopyFailed { category, path, error } => {
                write!(f, "[{category}] failed to copy {}: {error}", path.display())
            }
            Warning::ThemeIdUnavailable { error } => {
                write!(f, "global theme ID unavailable: {error}")
            }
            Warning::ThemeNotRecorded => {
                write!(f, "snapshot has no recorded global theme; theme switch skipped")
            }
            Warning::ThemeNotInstalled { theme_id } => write!(
                f,
                "global theme '{theme_id}' is not installed; install it (System Settings > \
                 Global Theme > Get New) and restore again to apply it"
            ),
            Warning::ThemeCheckFailed { theme_id, error } => write!(
                f,
                "could not list installed global themes ({error}); '{theme_id}' not applied"
            ),
            Warning::ThemeApplyFailed { theme_id, error } => {
                write!(f, "failed to apply global theme '{theme_id}': {error}")
            }
            Warning::MissingWidget { plugin } => write!(
                f,
                "widget '{plugin}' is not installed and will not render until it is installed"
            ),
            Warning::WidgetCheckFailed { error } => {
                write!(f, "could not list installed widgets: {error}")
            }
            Warning::CacheRefreshFailed { error } => {
                write!(f, "configuration cache refresh failed: {error}")
            }
        }
    }
}

/// Outcome of a backup run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupReport {
    pub name: String,
    /// Published snapshot directory, `None` when a cancelled run saved nothing
    pub snapshot_dir: Option<PathBuf>,
    pub archive_path: Option<PathBuf>,
    /// Recorded global theme, empty when it could not be queried
    pub theme_id: String,
    /// Categories with at least one location captured
    pub captured: Vec<String>,
    pub warnings: Vec<Warning>,
    pub cancelled: bool,
}

/// Outcome of a restore run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    pub name: String,
    pub mode: RestoreMode,
    /// Categories with at least one location written back
    pub restored: Vec<String>,
    /// Global theme that was switched to, if any
    pub applied_theme: Option<String>,
    pub warnings: Vec<Warning>,
    pub cancelled: bool,
}

impl RestoreReport {
    pub(crate) fn new(name: &str, mode: RestoreMode) -> Self {
        Self {
            name: name.to_string(),
            mode,
            restored: Vec::new(),
            applied_theme: None,
            warnings: Vec::new(),
            cancelled: false,
        }
    }

    /// Plugins reported missing during this restore
    pub fn missing_widgets(&self) -> impl Iterator<Item = &str> {
        self.warnings.iter().filter_map(|w| match w {
            Warning::MissingWidget { plugin } => Some(plugin.as_str()),
            _ => None,
        })
    }
}
