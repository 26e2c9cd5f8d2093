/*!
Local filesystem snapshot store.
*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::{name_from_archive, validate_name, SnapshotStore};
use crate::compression::{ArchiveCodec, TarGzCodec};
use crate::fsops::{path_exists, remove_path};
use crate::{Result, ThemeError};

static HIDDEN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Snapshot store rooted at a directory such as `~/kde-theme-backups`
///
/// Each snapshot lives in `<root>/<name>/` with its archive at
/// `<root>/<name>.tar.gz`. The root is created on first write.
///
/// # Example
/// ```rust,no_run
/// use kde_theme_core::storage::{LocalSnapshotStore, SnapshotStore};
///
/// let store = LocalSnapshotStore::new("/home/me/kde-theme-backups");
/// for name in store.list()? {
///     println!("{name}");
/// }
/// # Ok::<(), kde_theme_core::ThemeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore<C: ArchiveCodec = TarGzCodec> {
    root: PathBuf,
    codec: C,
}

impl LocalSnapshotStore<TarGzCodec> {
    /// Create a store at `root` using the default tar.gz codec
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_codec(root, TarGzCodec::new())
    }
}

impl<C: ArchiveCodec> LocalSnapshotStore<C> {
    /// Create a store at `root` using a specific archive codec
    pub fn with_codec<P: AsRef<Path>>(root: P, codec: C) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            codec,
        }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn archive_file(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{}", self.codec.extension()))
    }

    fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| ThemeError::io_at(&self.root, e))
    }

    fn is_snapshot_dir(&self, name: &str) -> bool {
        self.snapshot_dir(name).is_dir()
    }

    /// Fresh hidden sibling used while a snapshot is being built or replaced
    fn hidden(&self, name: &str, purpose: &str, extension: Option<&str>) -> PathBuf {
        let seq = HIDDEN_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut file_name = format!(".{purpose}-{name}-{}-{seq}", std::process::id());
        if let Some(ext) = extension {
            file_name.push('.');
            file_name.push_str(ext);
        }
        self.root.join(file_name)
    }

    /// Move a finished staging directory and archive into place
    ///
    /// Both renames stay inside the root, so each is atomic. An existing
    /// snapshot is moved aside first and only deleted once the new one is in.
    fn swap_in(&self, name: &str, staging: &Path, packed: &Path, overwrite: bool) -> Result<()> {
        let dir = self.snapshot_dir(name);
        let archive = self.archive_file(name);
        if !overwrite && path_exists(&dir) {
            return Err(ThemeError::AlreadyExists(name.to_string()));
        }

        let retired_dir = self.hidden(name, "retired", None);
        let retired_archive = self.hidden(name, "retired", Some(self.codec.extension()));
        move_if_present(&dir, &retired_dir)?;
        if let Err(e) = move_if_present(&archive, &retired_archive) {
            reinstate(&retired_dir, &dir);
            return Err(e);
        }
        if path_exists(&retired_dir) {
            info!("Replacing existing snapshot '{}'", name);
        }

        if let Err(e) = fs::rename(staging, &dir) {
            reinstate(&retired_dir, &dir);
            reinstate(&retired_archive, &archive);
            return Err(ThemeError::io_at(&dir, e));
        }
        if let Err(e) = fs::rename(packed, &archive) {
            // hand the tree back so the caller can discard it
            reinstate(&dir, staging);
            reinstate(&retired_dir, &dir);
            reinstate(&retired_archive, &archive);
            return Err(ThemeError::io_at(&archive, e));
        }

        for retired in [&retired_dir, &retired_archive] {
            if let Err(e) = remove_path(retired) {
                warn!("Could not remove {}: {}", retired.display(), e);
            }
        }
        Ok(())
    }
}

fn move_if_present(from: &Path, to: &Path) -> Result<()> {
    if path_exists(from) {
        fs::rename(from, to).map_err(|e| ThemeError::io_at(from, e))?;
    }
    Ok(())
}

/// Best-effort rename used to roll back a failed swap
fn reinstate(from: &Path, to: &Path) {
    if !path_exists(from) {
        return;
    }
    if let Err(e) = fs::rename(from, to) {
        warn!("Could not move {} back to {}: {}", from.display(), to.display(), e);
    }
}

impl<C: ArchiveCodec> SnapshotStore for LocalSnapshotStore<C> {
    fn stage(&self, name: &str, overwrite: bool) -> Result<PathBuf> {
        validate_name(name)?;
        if !overwrite && path_exists(&self.snapshot_dir(name)) {
            return Err(ThemeError::AlreadyExists(name.to_string()));
        }
        self.ensure_root()?;

        let staging = self.hidden(name, "backup", None);
        fs::create_dir(&staging).map_err(|e| ThemeError::io_at(&staging, e))?;
        debug!("Staging snapshot '{}' in {}", name, staging.display());
        Ok(staging)
    }

    fn commit(&self, name: &str, staging: &Path, overwrite: bool) -> Result<PathBuf> {
        let packed = self.hidden(name, "backup", Some(self.codec.extension()));
        self.codec.pack(staging, name, &packed)?;

        if let Err(e) = self.swap_in(name, staging, &packed, overwrite) {
            if let Err(cleanup) = remove_path(&packed) {
                warn!("Could not remove {}: {}", packed.display(), cleanup);
            }
            return Err(e);
        }

        let archive = self.archive_file(name);
        info!("Committed snapshot '{}' with archive {}", name, archive.display());
        Ok(archive)
    }

    fn discard(&self, staging: &Path) -> Result<()> {
        debug!("Discarding {}", staging.display());
        remove_path(staging)
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ThemeError::io_at(&self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ThemeError::io_at(&self.root, e))?;
            let Ok(name) = entry.file_name().into_string() else {
                debug!("Ignoring non UTF-8 entry {:?}", entry.file_name());
                continue;
            };
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name).map_err(|_| ThemeError::NotFound(name.to_string()))?;
        if self.is_snapshot_dir(name) {
            Ok(self.snapshot_dir(name))
        } else {
            Err(ThemeError::NotFound(name.to_string()))
        }
    }

    fn archive_path(&self, name: &str) -> Option<PathBuf> {
        let archive = self.archive_file(name);
        archive.is_file().then_some(archive)
    }

    fn delete(&self, name: &str) -> Result<()> {
        validate_name(name).map_err(|_| ThemeError::NotFound(name.to_string()))?;
        let dir = self.snapshot_dir(name);
        let archive = self.archive_file(name);
        if !path_exists(&dir) && !path_exists(&archive) {
            return Err(ThemeError::NotFound(name.to_string()));
        }
        remove_path(&dir)?;
        remove_path(&archive)?;
        info!("Deleted snapshot '{}'", name);
        Ok(())
    }

    fn import(&self, archive: &Path, overwrite: bool) -> Result<String> {
        let name = name_from_archive(archive)?;
        if !archive.is_file() {
            return Err(ThemeError::io_at(
                archive,
                io::Error::new(io::ErrorKind::NotFound, "archive not found"),
            ));
        }
        let dir = self.snapshot_dir(&name);
        if path_exists(&dir) && !overwrite {
            return Err(ThemeError::AlreadyExists(name));
        }
        self.ensure_root()?;

        let staging = tempfile::Builder::new()
            .prefix(".import-")
            .tempdir_in(&self.root)
            .map_err(|e| ThemeError::io_at(&self.root, e))?;
        self.codec.unpack(archive, staging.path())?;

        let mut top_level = Vec::new();
        for entry in fs::read_dir(staging.path()).map_err(|e| ThemeError::io_at(staging.path(), e))? {
            top_level.push(entry.map_err(|e| ThemeError::io_at(staging.path(), e))?.path());
        }
        let unpacked = match top_level.as_slice() {
            [single] if single.is_dir() => single.clone(),
            _ => {
                return Err(ThemeError::archive(format!(
                    "{} must contain exactly one top-level snapshot directory",
                    archive.display()
                )))
            }
        };

        if overwrite {
            remove_path(&dir)?;
        }
        fs::rename(&unpacked, &dir).map_err(|e| ThemeError::io_at(&dir, e))?;

        let stored_archive = self.archive_file(&name);
        let same_file = match (archive.canonicalize(), stored_archive.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_file {
            fs::copy(archive, &stored_archive).map_err(|e| ThemeError::io_at(&stored_archive, e))?;
        }

        info!("Imported '{}' from {}", name, archive.display());
        Ok(name)
    }
}
