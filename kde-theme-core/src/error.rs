/*!
Error types for the KDE theme backup engine.
*/

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type used throughout the core.
pub type Result<T> = std::result::Result<T, ThemeError>;

/// Errors that abort a backup, restore or store operation.
///
/// Recoverable conditions (missing sources, uninstalled themes, missing
/// widgets) are not errors; they are reported as [`crate::Warning`]s.
#[derive(Error, Debug)]
pub enum ThemeError {
    /// A snapshot with this name already exists and overwrite was not requested
    #[error("Snapshot '{0}' already exists (use --force to overwrite)")]
    AlreadyExists(String),

    /// No snapshot with this name exists in the store
    #[error("Snapshot '{0}' not found")]
    NotFound(String),

    /// I/O errors on a specific path
    #[error("I/O error on {}: {source}", path.display())]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Archive packing/unpacking errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// Snapshot name rejected by validation
    #[error("Invalid snapshot name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// An external desktop utility is missing or failed
    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    /// Configuration validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ThemeError {
    /// Wrap an I/O error with the path it happened on
    pub fn io_at<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::PathIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new archive error
    pub fn archive<S: Into<String>>(msg: S) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new invalid name error
    pub fn invalid_name<S1: Into<String>, S2: Into<String>>(name: S1, reason: S2) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new external command error
    pub fn command<S1: Into<String>, S2: Into<String>>(command: S1, message: S2) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }
}
