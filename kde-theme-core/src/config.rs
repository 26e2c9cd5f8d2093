//! Configuration for the snapshot store and the directories the catalog expands against
//!
//! Defaults follow the user's environment: `~/kde-theme-backups` for the
//! store, and the XDG config/data directories for the catalog. The store root
//! can be overridden with `KDE_THEME_BACKUP_DIR`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, ThemeError};

/// Environment variable overriding the snapshot root
pub const BACKUP_DIR_ENV: &str = "KDE_THEME_BACKUP_DIR";

/// Directory name of the default snapshot root under the home directory
pub const DEFAULT_BACKUP_DIR_NAME: &str = "kde-theme-backups";

/// Gzip level used for snapshot archives unless configured otherwise
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory holding snapshot directories and archives
    pub backup_root: PathBuf,
    /// User home directory (`home` catalog base)
    pub home_dir: PathBuf,
    /// User configuration directory (`config` catalog base)
    pub config_dir: PathBuf,
    /// User data directory (`data` catalog base)
    pub data_dir: PathBuf,
    /// Directories searched for installed plasmoid packages
    pub plasmoid_dirs: Vec<PathBuf>,
    /// Qt plugin directories searched for compiled applets (`*.so`)
    #[serde(default)]
    pub applet_plugin_dirs: Vec<PathBuf>,
    /// Gzip compression level for archives (0-9)
    pub compression_level: u32,
}

impl Settings {
    /// Build settings from the current user's environment
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| ThemeError::validation("could not determine the home directory"))?;
        let config_dir = dirs::config_dir().unwrap_or_else(|| home.join(".config"));
        let data_dir = dirs::data_dir().unwrap_or_else(|| home.join(".local/share"));

        let backup_root = std::env::var_os(BACKUP_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(DEFAULT_BACKUP_DIR_NAME));

        let mut plasmoid_dirs = vec![data_dir.join("plasma/plasmoids")];
        plasmoid_dirs.extend(system_data_dirs().into_iter().map(|d| d.join("plasma/plasmoids")));

        Ok(Self {
            backup_root,
            home_dir: home,
            config_dir,
            data_dir,
            plasmoid_dirs,
            applet_plugin_dirs: qt_plugin_dirs()
                .into_iter()
                .map(|d| d.join("plasma/applets"))
                .collect(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        })
    }

    /// Build settings rooted entirely under `home`, ignoring the environment
    ///
    /// Used by tests and by callers that manage a sandboxed home directory.
    pub fn with_home<P: AsRef<Path>>(home: P) -> Self {
        let home = home.as_ref().to_path_buf();
        let data_dir = home.join(".local/share");
        Self {
            backup_root: home.join(DEFAULT_BACKUP_DIR_NAME),
            config_dir: home.join(".config"),
            plasmoid_dirs: vec![data_dir.join("plasma/plasmoids")],
            applet_plugin_dirs: Vec::new(),
            data_dir,
            home_dir: home,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Replace the snapshot root
    pub fn with_backup_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.backup_root = root.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let dirs = [
            ("backup root", &self.backup_root),
            ("home directory", &self.home_dir),
            ("config directory", &self.config_dir),
            ("data directory", &self.data_dir),
        ];
        for (label, path) in dirs {
            if !path.is_absolute() {
                return Err(ThemeError::validation(format!(
                    "{label} must be an absolute path, got {}",
                    path.display()
                )));
            }
        }
        if self.compression_level > 9 {
            return Err(ThemeError::validation(format!(
                "compression level must be between 0 and 9, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }
}

/// System-wide XDG data directories (`$XDG_DATA_DIRS`, falling back to the XDG default)
fn system_data_dirs() -> Vec<PathBuf> {
    let raw = std::env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
    raw.split(':')
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Qt plugin directories from `$QT_PLUGIN_PATH` plus the common distribution locations
fn qt_plugin_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::env::var("QT_PLUGIN_PATH")
        .ok()
        .map(|v| v.split(':').filter(|s| !s.is_empty()).map(PathBuf::from).collect())
        .unwrap_or_default();
    for candidate in [
        "/usr/lib/qt6/plugins",
        "/usr/lib64/qt6/plugins",
        "/usr/lib/x86_64-linux-gnu/qt6/plugins",
        "/usr/lib/aarch64-linux-gnu/qt6/plugins",
        "/usr/lib/qt/plugins",
        "/usr/lib64/qt5/plugins",
        "/usr/lib/x86_64-linux-gnu/qt5/plugins",
    ] {
        let path = PathBuf::from(candidate);
        if !dirs.contains(&path) {
            dirs.push(path);
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_home_layout() {
        let settings = Settings::with_home("/home/alice");
        assert_eq!(settings.backup_root, PathBuf::from("/home/alice/kde-theme-backups"));
        assert_eq!(settings.config_dir, PathBuf::from("/home/alice/.config"));
        assert_eq!(settings.data_dir, PathBuf::from("/home/alice/.local/share"));
        assert_eq!(
            settings.plasmoid_dirs,
            vec![PathBuf::from("/home/alice/.local/share/plasma/plasmoids")]
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_with_backup_root_override() {
        let settings = Settings::with_home("/home/alice").with_backup_root("/mnt/usb/themes");
        assert_eq!(settings.backup_root, PathBuf::from("/mnt/usb/themes"));
        assert_eq!(settings.home_dir, PathBuf::from("/home/alice"));
    }

    #[test]
    fn test_validation_rejects_relative_root() {
        let settings = Settings::with_home("/home/alice").with_backup_root("backups");
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("backup root"));
    }

    #[test]
    fn test_validation_rejects_bad_compression_level() {
        let mut settings = Settings::with_home("/home/alice");
        settings.compression_level = 12;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_serialization_roundtrip() {
        let settings = Settings::with_home("/home/alice");
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, back);
    }
}
