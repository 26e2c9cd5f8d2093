/*!
kde-theme - back up and restore KDE Plasma themes and panel layouts.

Snapshots live under `~/kde-theme-backups` (or `--root` / `KDE_THEME_BACKUP_DIR`)
as a directory plus a portable `.tar.gz` archive.
*/

use clap::{Parser, Subcommand};
use kde_theme_core::{
    config::BACKUP_DIR_ENV, create_default_engine, init_tracing, BackupReport, LocalSnapshotStore,
    LogFormat, PlasmaDesktop, RestoreMode, RestoreReport, Settings, ThemeEngine, Warning,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tabled::{Table, Tabled};
use tracing::{info, warn};

/// Exit code for a run interrupted by Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

type Engine = ThemeEngine<LocalSnapshotStore, PlasmaDesktop>;

#[derive(Parser)]
#[command(name = "kde-theme")]
#[command(about = "Back up and restore KDE Plasma themes and panel layouts")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding snapshots (default: ~/kde-theme-backups)
    #[arg(long, global = true, env = BACKUP_DIR_ENV)]
    root: Option<PathBuf>,

    /// Log output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the current theme and layout into a new snapshot
    Backup {
        /// Snapshot name (no spaces, '/', '\' or ':')
        name: String,
        /// Replace an existing snapshot with the same name
        #[arg(short, long)]
        force: bool,
    },
    /// Restore the theme categories and switch to the recorded global theme
    Restore { name: String },
    /// Restore only the panel layout, widgets and docks
    RestoreLayout { name: String },
    /// Restore everything in the snapshot
    RestoreAll { name: String },
    /// List all snapshots
    List {
        /// Show theme, creation time and archive size
        #[arg(short, long)]
        detailed: bool,
    },
    /// Show details of a specific snapshot
    Show { name: String },
    /// Delete a snapshot and its archive
    Delete {
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Import a snapshot archive (e.g. one copied from another machine)
    Import {
        /// Path to a `<name>.tar.gz` archive
        archive: PathBuf,
        /// Replace an existing snapshot with the same name
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Tabled)]
struct SnapshotInfo {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Global Theme")]
    theme: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Categories")]
    categories: String,
    #[tabled(rename = "Archive")]
    size: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode, anyhow::Error> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format)?;

    let engine = create_default_engine(load_settings(cli.root.as_deref())?)?;

    let interrupted = match cli.command {
        Commands::Backup { name, force } => backup(engine, name, force).await?,
        Commands::Restore { name } => restore(engine, name, RestoreMode::Theme).await?,
        Commands::RestoreLayout { name } => restore(engine, name, RestoreMode::Layout).await?,
        Commands::RestoreAll { name } => restore(engine, name, RestoreMode::All).await?,
        Commands::List { detailed } => list_snapshots(&engine, detailed)?,
        Commands::Show { name } => show_snapshot(&engine, &name)?,
        Commands::Delete { name, force } => delete_snapshot(&engine, &name, force)?,
        Commands::Import { archive, force } => import_snapshot(&engine, &archive, force)?,
    };

    if interrupted {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}

fn load_settings(root: Option<&Path>) -> Result<Settings, anyhow::Error> {
    let settings = Settings::from_env()?;
    Ok(match root {
        Some(root) if root.is_relative() => {
            settings.with_backup_root(std::env::current_dir()?.join(root))
        }
        Some(root) => settings.with_backup_root(root),
        None => settings,
    })
}

/// Run a blocking engine operation on a worker thread, cancelling it on Ctrl-C
async fn run_cancellable<T, F>(engine: Engine, op: F) -> Result<T, anyhow::Error>
where
    T: Send + 'static,
    F: FnOnce(&Engine) -> kde_theme_core::Result<T> + Send + 'static,
{
    let flag = engine.cancellation();
    let mut task = tokio::task::spawn_blocking(move || op(&engine));

    tokio::select! {
        joined = &mut task => Ok(joined??),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping after the current category");
            flag.cancel();
            Ok(task.await??)
        }
    }
}

async fn backup(engine: Engine, name: String, force: bool) -> Result<bool, anyhow::Error> {
    info!("Backing up to snapshot '{}'", name);
    let report = run_cancellable(engine, move |engine| engine.backup(&name, force)).await?;
    print_backup(&report);
    Ok(report.cancelled)
}

async fn restore(engine: Engine, name: String, mode: RestoreMode) -> Result<bool, anyhow::Error> {
    info!("Restoring snapshot '{}' ({})", name, mode);
    let report = run_cancellable(engine, move |engine| engine.restore(&name, mode)).await?;
    print_restore(&report);
    Ok(report.cancelled)
}

fn print_backup(report: &BackupReport) {
    match &report.snapshot_dir {
        Some(dir) => println!("✓ Snapshot '{}' saved to {}", report.name, dir.display()),
        None => println!("✗ Backup '{}' interrupted; nothing was saved", report.name),
    }
    if let Some(archive) = &report.archive_path {
        println!("  Archive: {}", archive.display());
    }
    if !report.theme_id.is_empty() {
        println!("  Global theme: {}", report.theme_id);
    }
    println!("  Captured: {}", join_or_none(&report.captured));
    print_warnings(&report.warnings);
}

fn print_restore(report: &RestoreReport) {
    if report.cancelled {
        println!("✗ Restore of '{}' interrupted", report.name);
    } else {
        println!("✓ Restored '{}' ({})", report.name, report.mode);
    }
    println!("  Restored: {}", join_or_none(&report.restored));
    if let Some(theme) = &report.applied_theme {
        println!("  Applied global theme: {theme}");
    }
    print_warnings(&report.warnings);
    if report.missing_widgets().next().is_some() {
        println!("  Install the missing widgets (Add Widgets > Get New Widgets), then log out and in");
    }
}

/// Warnings are already logged; this repeats them as a summary on stdout
fn print_warnings(warnings: &[Warning]) {
    let notable: Vec<&Warning> = warnings
        .iter()
        .filter(|w| !matches!(w, Warning::SourceMissing { .. }))
        .collect();
    let skipped = warnings.len() - notable.len();
    if skipped > 0 {
        println!("  Skipped {skipped} locations not present on this system");
    }
    for warning in notable {
        println!("  ⚠ {warning}");
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn list_snapshots(engine: &Engine, detailed: bool) -> Result<bool, anyhow::Error> {
    let names = engine.list()?;

    if !detailed {
        for name in names {
            println!("{name}");
        }
        return Ok(false);
    }

    if names.is_empty() {
        println!("No snapshots found in {}", engine.settings().backup_root.display());
        return Ok(false);
    }

    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        match engine.show(&name) {
            Ok(summary) => rows.push(SnapshotInfo {
                name,
                theme: summary.theme_id.unwrap_or_else(|| "-".to_string()),
                created: summary
                    .metadata
                    .as_ref()
                    .map(|m| format_timestamp(m.created_at.timestamp()))
                    .unwrap_or_else(|| "-".to_string()),
                categories: summary
                    .metadata
                    .as_ref()
                    .map(|m| m.categories.len().to_string())
                    .unwrap_or_else(|| "-".to_string()),
                size: summary
                    .archive_size
                    .map(format_size)
                    .unwrap_or_else(|| "-".to_string()),
            }),
            Err(e) => warn!("Failed to read snapshot {}: {}", name, e),
        }
    }

    println!("{}", Table::new(rows));
    Ok(false)
}

fn show_snapshot(engine: &Engine, name: &str) -> Result<bool, anyhow::Error> {
    let summary = engine.show(name)?;

    println!("Snapshot Details:");
    println!("  Name: {}", summary.name);
    println!("  Path: {}", summary.path.display());
    println!(
        "  Global Theme: {}",
        summary.theme_id.as_deref().unwrap_or("(not recorded)")
    );
    match (&summary.archive, summary.archive_size) {
        (Some(archive), Some(size)) => {
            println!("  Archive: {} ({})", archive.display(), format_size(size))
        }
        (Some(archive), None) => println!("  Archive: {}", archive.display()),
        _ => println!("  Archive: (none)"),
    }

    if let Some(metadata) = &summary.metadata {
        println!("  Created: {}", format_timestamp(metadata.created_at.timestamp()));
        println!("  Format Version: {}", metadata.format_version);
        println!("  Tool Version: {}", metadata.tool_version);
        println!("  Categories: {}", join_or_none(&metadata.categories));
        if !metadata.skipped.is_empty() {
            println!("  Skipped:");
            for path in &metadata.skipped {
                println!("    {}", path.display());
            }
        }
    }

    Ok(false)
}

fn delete_snapshot(engine: &Engine, name: &str, force: bool) -> Result<bool, anyhow::Error> {
    if !force {
        print!("Are you sure you want to delete snapshot '{name}'? (y/N): ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().to_lowercase().starts_with('y') {
            println!("Deletion cancelled");
            return Ok(false);
        }
    }

    engine.delete(name)?;
    println!("✓ Snapshot deleted successfully");
    Ok(false)
}

fn import_snapshot(engine: &Engine, archive: &Path, force: bool) -> Result<bool, anyhow::Error> {
    let name = engine.import(archive, force)?;
    println!("✓ Imported snapshot '{name}'");
    println!("  Restore it with: kde-theme restore-all {name}");
    Ok(false)
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

fn format_timestamp(timestamp: i64) -> String {
    use chrono::{Local, TimeZone};

    match Local.timestamp_opt(timestamp, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => timestamp.to_string(),
    }
}
