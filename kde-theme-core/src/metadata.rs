/*!
Snapshot metadata stored inside each snapshot directory.

Two files are written: `theme-id.txt` holds only the Global Theme ID and is
what restore reads, and `snapshot.json` holds descriptive metadata used for
listing and inspection. Snapshots without `snapshot.json` (imported from
older tooling) remain restorable.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Result, ThemeError};

/// Current metadata format version for compatibility tracking
pub const METADATA_FORMAT_VERSION: u8 = 1;

/// File holding the recorded Global Theme ID
pub const THEME_ID_FILE: &str = "theme-id.txt";

/// File holding [`SnapshotMetadata`] as JSON
pub const METADATA_FILE: &str = "snapshot.json";

/// Descriptive metadata for a snapshot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SnapshotMetadata {
    /// Snapshot name (same as its directory name)
    pub name: String,

    /// When the backup was taken
    pub created_at: DateTime<Utc>,

    /// Global Theme ID active at backup time, empty if it could not be read
    pub theme_id: String,

    /// Format version for compatibility (current: 1)
    pub format_version: u8,

    /// Categories with at least one location captured
    pub categories: Vec<String>,

    /// Live locations that were absent or failed to copy
    #[serde(default)]
    pub skipped: Vec<PathBuf>,

    /// Version of the tool that wrote the snapshot
    pub tool_version: String,
}

impl SnapshotMetadata {
    /// Create metadata for a snapshot taken now
    ///
    /// # Example
    /// ```rust
    /// use kde_theme_core::SnapshotMetadata;
    ///
    /// let metadata = SnapshotMetadata::new("win11-dark", "org.kde.breezedark.desktop");
    /// assert_eq!(metadata.name, "win11-dark");
    /// assert!(metadata.categories.is_empty());
    /// ```
    pub fn new<S1, S2>(name: S1, theme_id: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            theme_id: theme_id.into(),
            format_version: METADATA_FORMAT_VERSION,
            categories: Vec::new(),
            skipped: Vec::new(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Set the captured categories
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Set the skipped locations
    pub fn with_skipped(mut self, skipped: Vec<PathBuf>) -> Self {
        self.skipped = skipped;
        self
    }

    /// Validate that all required fields are properly set
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ThemeError::validation("snapshot name cannot be empty"));
        }
        if !self.is_compatible() {
            return Err(ThemeError::validation(format!(
                "unsupported snapshot format version {} (current: {})",
                self.format_version, METADATA_FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Check if this metadata is compatible with the current format version
    pub fn is_compatible(&self) -> bool {
        self.format_version <= METADATA_FORMAT_VERSION
    }

    /// Write `snapshot.json` and `theme-id.txt` into `snapshot_dir`
    pub fn write_to(&self, snapshot_dir: &Path) -> Result<()> {
        write_theme_id(snapshot_dir, &self.theme_id)?;
        let path = snapshot_dir.join(METADATA_FILE);
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(&path, json).map_err(|e| ThemeError::io_at(&path, e))
    }

    /// Read `snapshot.json` from `snapshot_dir`, `None` if the snapshot has none
    pub fn read_from(snapshot_dir: &Path) -> Result<Option<Self>> {
        let path = snapshot_dir.join(METADATA_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ThemeError::io_at(&path, e)),
        };
        let metadata: Self = serde_json::from_slice(&bytes)?;
        metadata.validate()?;
        Ok(Some(metadata))
    }
}

/// Persist the Global Theme ID as `theme-id.txt`
pub fn write_theme_id(snapshot_dir: &Path, theme_id: &str) -> Result<()> {
    let path = snapshot_dir.join(THEME_ID_FILE);
    fs::write(&path, format!("{theme_id}\n")).map_err(|e| ThemeError::io_at(&path, e))
}

/// Read the recorded Global Theme ID; `None` when absent or empty
pub fn read_theme_id(snapshot_dir: &Path) -> Result<Option<String>> {
    let path = snapshot_dir.join(THEME_ID_FILE);
    match fs::read_to_string(&path) {
        Ok(text) => {
            let id = text.trim();
            Ok((!id.is_empty()).then(|| id.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ThemeError::io_at(&path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_metadata_creation() {
        let metadata = SnapshotMetadata::new("macosfull", "com.github.vinceliuice.WhiteSur");
        assert_eq!(metadata.name, "macosfull");
        assert_eq!(metadata.theme_id, "com.github.vinceliuice.WhiteSur");
        assert_eq!(metadata.format_version, METADATA_FORMAT_VERSION);
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn test_write_and_read_back() {
        let tmp = TempDir::new().unwrap();
        let metadata = SnapshotMetadata::new("default", "org.kde.breeze.desktop")
            .with_categories(vec!["icons".to_string(), "kvantum".to_string()])
            .with_skipped(vec![PathBuf::from("/home/me/.config/latte")]);

        metadata.write_to(tmp.path()).unwrap();

        let loaded = SnapshotMetadata::read_from(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded, metadata);
        assert_eq!(
            read_theme_id(tmp.path()).unwrap().as_deref(),
            Some("org.kde.breeze.desktop")
        );
    }

    #[test]
    fn test_missing_files_read_as_none() {
        let tmp = TempDir::new().unwrap();
        assert!(SnapshotMetadata::read_from(tmp.path()).unwrap().is_none());
        assert!(read_theme_id(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn test_blank_theme_id_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        write_theme_id(tmp.path(), "").unwrap();
        assert!(read_theme_id(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn test_theme_id_is_trimmed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(THEME_ID_FILE), "  org.kde.breezedark.desktop \n\n").unwrap();
        assert_eq!(
            read_theme_id(tmp.path()).unwrap().as_deref(),
            Some("org.kde.breezedark.desktop")
        );
    }
}
