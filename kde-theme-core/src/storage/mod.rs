/*!
Snapshot store: the on-disk home of named snapshots.

The engines only reach snapshot directories through [`SnapshotStore`]; the
local filesystem adapter is the production implementation.
*/

pub mod local;

use std::path::{Path, PathBuf};

use crate::{Result, ThemeError};

pub use local::LocalSnapshotStore;

/// Storage abstraction for named snapshot directories and their archives
pub trait SnapshotStore {
    /// Create a hidden staging directory for a new snapshot
    ///
    /// Nothing visible changes until [`SnapshotStore::commit`]. Fails with
    /// [`ThemeError::AlreadyExists`] if `name` is taken and `overwrite` is
    /// false, before anything is written.
    fn stage(&self, name: &str, overwrite: bool) -> Result<PathBuf>;

    /// Archive a filled staging directory and publish it as `name`
    ///
    /// With `overwrite`, the previous snapshot and archive are only swapped
    /// out once the new archive exists, and are put back if the swap fails.
    /// Returns the archive path.
    fn commit(&self, name: &str, staging: &Path, overwrite: bool) -> Result<PathBuf>;

    /// Throw away a staging directory that will not be committed
    fn discard(&self, staging: &Path) -> Result<()>;

    /// Names of all snapshots, in lexicographic order
    fn list(&self) -> Result<Vec<String>>;

    /// Directory of an existing snapshot, or [`ThemeError::NotFound`]
    fn path(&self, name: &str) -> Result<PathBuf>;

    /// Archive of a snapshot, if one exists
    fn archive_path(&self, name: &str) -> Option<PathBuf>;

    /// Remove a snapshot directory and its archive
    fn delete(&self, name: &str) -> Result<()>;

    /// Unpack an archive produced by [`SnapshotStore::commit`] into the store
    ///
    /// Returns the name of the imported snapshot.
    fn import(&self, archive: &Path, overwrite: bool) -> Result<String>;
}

/// Check that `name` is usable as a snapshot directory name
///
/// Names must be non-empty, must not contain whitespace, `/`, `\` or `:`,
/// and must not start with `.` (hidden entries are reserved for the store).
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ThemeError::invalid_name(name, "name is empty"));
    }
    if name.starts_with('.') {
        return Err(ThemeError::invalid_name(name, "name must not start with '.'"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '\\' | ':'))
    {
        return Err(ThemeError::invalid_name(
            name,
            format!("name must not contain {c:?} (no spaces or / : \\ allowed)"),
        ));
    }
    Ok(())
}

/// Derive a snapshot name from an archive file name (`macos.tar.gz` -> `macos`)
pub fn name_from_archive(archive: &Path) -> Result<String> {
    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ThemeError::archive(format!("{} is not a file", archive.display())))?;
    let name = file_name
        .strip_suffix(".tar.gz")
        .or_else(|| file_name.strip_suffix(".tgz"))
        .ok_or_else(|| {
            ThemeError::archive(format!("{file_name} is not a .tar.gz or .tgz archive"))
        })?;
    validate_name(name)?;
    Ok(name.to_string())
}
