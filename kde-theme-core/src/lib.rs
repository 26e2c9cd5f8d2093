/*!
# KDE Theme Core

Backup and restore of a KDE Plasma desktop's look and layout.

A snapshot captures the global theme, Plasma configuration, window
decorations, icons, colour schemes, wallpapers, Kvantum themes, the panel
layout and third-party widgets into a named directory plus a portable
`.tar.gz` archive. Snapshots can later be restored whole, theme-only or
layout-only.

## Architecture

- [`catalog`] is the fixed list of categories and the paths they cover
- [`storage`] holds named snapshots on disk behind the [`SnapshotStore`] trait
- [`desktop`] wraps the Plasma utilities behind the [`DesktopEnvironment`] trait
- [`ThemeEngine`] runs backups and restores over a store and a desktop

## Usage

```rust,no_run
use kde_theme_core::{create_default_engine, RestoreMode, Settings};

let engine = create_default_engine(Settings::from_env()?)?;

engine.backup("macosfull", false)?;
for name in engine.list()? {
    println!("{name}");
}

let report = engine.restore("macosfull", RestoreMode::Layout)?;
for plugin in report.missing_widgets() {
    println!("install {plugin} to see it on the panel");
}
# Ok::<(), kde_theme_core::ThemeError>(())
```
*/

pub mod backup;
pub mod catalog;
pub mod compression;
pub mod config;
pub mod desktop;
pub mod error;
pub mod fsops;
pub mod metadata;
pub mod observability;
pub mod report;
pub mod restore;
pub mod snapshot;
pub mod storage;
pub mod widgets;

#[cfg(test)]
mod metadata_tests;

pub use catalog::{CategoryTag, RestoreMode};
pub use compression::{ArchiveCodec, TarGzCodec};
pub use config::Settings;
pub use desktop::{DesktopEnvironment, PlasmaDesktop};
pub use error::{Result, ThemeError};
pub use metadata::SnapshotMetadata;
pub use observability::{init_tracing, LogFormat};
pub use report::{BackupReport, RestoreReport, Warning};
pub use snapshot::{create_default_engine, CancellationFlag, SnapshotSummary, ThemeEngine};
pub use storage::{LocalSnapshotStore, SnapshotStore};
