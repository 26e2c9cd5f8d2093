/*!
Filesystem helpers shared by the backup and restore engines.
*/

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

use crate::{Result, ThemeError};

/// Copy a file, directory tree or symlink from `src` to `dst`
///
/// Parent directories of `dst` are created. A symlink at `src` itself is
/// followed, so a config file linked in from a dotfiles checkout is saved
/// by content. Symlinks inside a tree are recreated rather than followed,
/// so icon themes keep their internal links.
pub fn copy_path(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::metadata(src).map_err(|e| ThemeError::io_at(src, e))?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| ThemeError::io_at(parent, e))?;
    }

    if meta.is_dir() {
        copy_tree(src, dst)
    } else {
        copy_entry(src, dst, meta.file_type())
    }
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            ThemeError::io_at(&path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| ThemeError::validation(format!("walked outside {}: {e}", src.display())))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| ThemeError::io_at(&target, e))?;
        } else {
            copy_entry(entry.path(), &target, entry.file_type())?;
        }
    }
    Ok(())
}

fn copy_entry(src: &Path, dst: &Path, file_type: fs::FileType) -> Result<()> {
    if file_type.is_symlink() {
        let link = fs::read_link(src).map_err(|e| ThemeError::io_at(src, e))?;
        remove_path(dst)?;
        symlink(&link, dst).map_err(|e| ThemeError::io_at(dst, e))
    } else {
        fs::copy(src, dst)
            .map(|_| ())
            .map_err(|e| ThemeError::io_at(dst, e))
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    fs::copy(target, link).map(|_| ())
}

/// Remove whatever exists at `path`; absent paths are not an error
pub fn remove_path(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ThemeError::io_at(path, e)),
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| ThemeError::io_at(path, e))
}

/// Replace whatever is at `dst` with a copy of `src`
pub fn replace_path(src: &Path, dst: &Path) -> Result<()> {
    remove_path(dst)?;
    copy_path(src, dst)
}

/// Whether anything (including a dangling symlink) exists at `path`
pub fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
