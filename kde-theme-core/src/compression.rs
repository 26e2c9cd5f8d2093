/*!
Archive codecs for the portable form of a snapshot.

A snapshot directory is packed into a single gzip-compressed tarball whose only
top-level entry is the snapshot's own directory, so unpacking it into a store
root recreates `<root>/<name>/`.
*/

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::fs::File;
use std::path::Path;
use tar::{Archive, Builder};
use tracing::debug;

use crate::{Result, ThemeError};

/// Packs snapshot directories into archives and back
pub trait ArchiveCodec {
    /// Pack `dir` into `archive` with every entry under `entry_name/`
    ///
    /// The archive is written to a temporary file next to `archive` and
    /// renamed into place, so a failed run never leaves a truncated archive.
    /// Returns the archive size in bytes.
    fn pack(&self, dir: &Path, entry_name: &str, archive: &Path) -> Result<u64>;

    /// Unpack `archive` into `dest`
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()>;

    /// File extension of archives produced by this codec, without the leading dot
    fn extension(&self) -> &str;
}

/// Gzip-compressed tar codec
///
/// # Example
/// ```rust,no_run
/// use kde_theme_core::compression::{ArchiveCodec, TarGzCodec};
/// use std::path::Path;
///
/// let codec = TarGzCodec::new();
/// codec.pack(
///     Path::new("/home/me/kde-theme-backups/macos"),
///     "macos",
///     Path::new("/home/me/kde-theme-backups/macos.tar.gz"),
/// )?;
/// # Ok::<(), kde_theme_core::ThemeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TarGzCodec {
    compression_level: Compression,
}

impl TarGzCodec {
    /// Create a codec with the default gzip level (6)
    pub fn new() -> Self {
        Self {
            compression_level: Compression::default(),
        }
    }

    /// Create a codec with the given gzip level (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            compression_level: Compression::new(level),
        }
    }
}

impl Default for TarGzCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveCodec for TarGzCodec {
    fn pack(&self, dir: &Path, entry_name: &str, archive: &Path) -> Result<u64> {
        let parent = archive
            .parent()
            .ok_or_else(|| ThemeError::archive(format!("{} has no parent", archive.display())))?;
        let tmp = tempfile::Builder::new()
            .prefix(".archive-")
            .suffix(".partial")
            .tempfile_in(parent)
            .map_err(|e| ThemeError::io_at(parent, e))?;

        let encoder = GzEncoder::new(tmp.as_file(), self.compression_level);
        let mut builder = Builder::new(encoder);
        builder.follow_symlinks(false);
        builder.append_dir_all(entry_name, dir).map_err(|e| {
            ThemeError::archive(format!("Failed to add {} to archive: {e}", dir.display()))
        })?;
        builder
            .into_inner()
            .map_err(|e| ThemeError::archive(format!("Failed to finish tar stream: {e}")))?
            .finish()
            .map_err(|e| ThemeError::archive(format!("Failed to finish compression: {e}")))?;

        tmp.persist(archive)
            .map_err(|e| ThemeError::io_at(archive, e.error))?;

        let size = std::fs::metadata(archive)
            .map_err(|e| ThemeError::io_at(archive, e))?
            .len();
        debug!("Packed {} into {} ({} bytes)", dir.display(), archive.display(), size);
        Ok(size)
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file = File::open(archive).map_err(|e| ThemeError::io_at(archive, e))?;
        let mut tar = Archive::new(GzDecoder::new(file));
        tar.unpack(dest).map_err(|e| {
            ThemeError::archive(format!("Failed to unpack {}: {e}", archive.display()))
        })
    }

    fn extension(&self) -> &str {
        "tar.gz"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_snapshot(root: &Path) -> std::path::PathBuf {
        let dir = root.join("macos");
        fs::create_dir_all(dir.join("theme/config")).unwrap();
        fs::write(dir.join("theme/config/kdeglobals"), b"[KDE]\nLookAndFeelPackage=x\n".repeat(20))
            .unwrap();
        fs::write(dir.join("theme-id.txt"), b"com.github.vinceliuice.WhiteSur\n").unwrap();
        dir
    }

    #[test]
    fn test_pack_then_unpack_recreates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = sample_snapshot(tmp.path());
        let archive = tmp.path().join("macos.tar.gz");

        let codec = TarGzCodec::new();
        let size = codec.pack(&dir, "macos", &archive).unwrap();
        assert!(size > 0);

        let out = TempDir::new().unwrap();
        codec.unpack(&archive, out.path()).unwrap();
        assert_eq!(
            fs::read(out.path().join("macos/theme/config/kdeglobals")).unwrap(),
            fs::read(dir.join("theme/config/kdeglobals")).unwrap()
        );
        assert_eq!(
            fs::read_to_string(out.path().join("macos/theme-id.txt")).unwrap(),
            "com.github.vinceliuice.WhiteSur\n"
        );
    }

    #[test]
    fn test_pack_leaves_no_partial_files() {
        let tmp = TempDir::new().unwrap();
        let dir = sample_snapshot(tmp.path());
        TarGzCodec::with_level(1)
            .pack(&dir, "macos", &tmp.path().join("macos.tar.gz"))
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_unpack_invalid_archive_fails() {
        let tmp = TempDir::new().unwrap();
        let bogus = tmp.path().join("bogus.tar.gz");
        fs::write(&bogus, b"this is not a gzip stream").unwrap();

        let result = TarGzCodec::with_level(9).unpack(&bogus, tmp.path());
        assert!(matches!(result, Err(ThemeError::Archive(_))));
    }

    #[test]
    fn test_extension() {
        assert_eq!(TarGzCodec::default().extension(), "tar.gz");
    }
}
