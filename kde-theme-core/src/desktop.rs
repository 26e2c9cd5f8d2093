/*!
Narrow interface over the desktop environment's theme utilities.

The engines never touch "the current theme" directly: they read it through
[`DesktopEnvironment::current_global_theme`] at backup time and write it
through [`DesktopEnvironment::apply_global_theme`] at restore time. The Plasma
implementation shells out to the KDE tools; tests plug in a fake.
*/

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::debug;

use crate::config::Settings;
use crate::widgets::{applet_plugins, plasmoid_packages};
use crate::{Result, ThemeError};

/// Operations the engines need from the running desktop
pub trait DesktopEnvironment {
    /// Identifier of the active look-and-feel package
    fn current_global_theme(&self) -> Result<String>;

    /// Identifiers of every installed look-and-feel package
    fn installed_global_themes(&self) -> Result<BTreeSet<String>>;

    /// Switch the desktop to the given look-and-feel package
    fn apply_global_theme(&self, theme_id: &str) -> Result<()>;

    /// Plugin identifiers of every installed plasmoid
    fn installed_plasmoids(&self) -> Result<BTreeSet<String>>;

    /// Rebuild the desktop's configuration cache after files changed on disk
    fn refresh_caches(&self) -> Result<()>;
}

/// KDE Plasma 5/6 implementation backed by the Plasma command-line tools
#[derive(Debug, Clone)]
pub struct PlasmaDesktop {
    plasmoid_dirs: Vec<PathBuf>,
    applet_plugin_dirs: Vec<PathBuf>,
}

const KREADCONFIG: &[&str] = &["kreadconfig6", "kreadconfig5"];
const KBUILDSYCOCA: &[&str] = &["kbuildsycoca6", "kbuildsycoca5"];
const APPLY_LOOKANDFEEL: &str = "plasma-apply-lookandfeel";

impl PlasmaDesktop {
    /// Create a Plasma desktop adapter searching `plasmoid_dirs` for installed widgets
    pub fn new(plasmoid_dirs: Vec<PathBuf>) -> Self {
        Self {
            plasmoid_dirs,
            applet_plugin_dirs: Vec::new(),
        }
    }

    /// Also treat compiled applets under these Qt plugin directories as installed
    pub fn with_applet_plugin_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.applet_plugin_dirs = dirs;
        self
    }

    /// Build an adapter from the configured search directories
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.plasmoid_dirs.clone())
            .with_applet_plugin_dirs(settings.applet_plugin_dirs.clone())
    }
}

impl DesktopEnvironment for PlasmaDesktop {
    fn current_global_theme(&self) -> Result<String> {
        let output = run_first_available(
            KREADCONFIG,
            &["--file", "kdeglobals", "--group", "KDE", "--key", "LookAndFeelPackage"],
        )?;
        let theme_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if theme_id.is_empty() {
            return Err(ThemeError::command(
                KREADCONFIG[0],
                "kdeglobals has no LookAndFeelPackage entry",
            ));
        }
        Ok(theme_id)
    }

    fn installed_global_themes(&self) -> Result<BTreeSet<String>> {
        let output = run(APPLY_LOOKANDFEEL, &["--list"])?;
        Ok(parse_package_list(&String::from_utf8_lossy(&output.stdout)))
    }

    fn apply_global_theme(&self, theme_id: &str) -> Result<()> {
        run(APPLY_LOOKANDFEEL, &["--apply", theme_id]).map(|_| ())
    }

    fn installed_plasmoids(&self) -> Result<BTreeSet<String>> {
        let mut installed = BTreeSet::new();
        for dir in &self.plasmoid_dirs {
            installed.extend(plasmoid_packages(dir)?);
        }
        for dir in &self.applet_plugin_dirs {
            installed.extend(applet_plugins(dir)?);
        }
        debug!("Found {} installed plasmoids", installed.len());
        Ok(installed)
    }

    fn refresh_caches(&self) -> Result<()> {
        run_first_available(KBUILDSYCOCA, &[]).map(|_| ())
    }
}

/// Parse `plasma-apply-lookandfeel --list` style output into package identifiers
///
/// Non-identifier lines (headers, blank lines) are ignored.
pub fn parse_package_list(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(|line| line.trim().trim_start_matches(['*', '-']).trim())
        .filter(|line| !line.is_empty() && !line.contains(char::is_whitespace) && line.contains('.'))
        .map(str::to_string)
        .collect()
}

fn run(program: &str, args: &[&str]) -> Result<Output> {
    debug!("Running {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ThemeError::command(program, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ThemeError::command(
            program,
            format!("exited with {}: {}", output.status, stderr.trim()),
        ));
    }
    Ok(output)
}

/// Run the first program of `candidates` that exists on this system
fn run_first_available(candidates: &[&str], args: &[&str]) -> Result<Output> {
    let mut last_err = None;
    for program in candidates {
        match Command::new(program).args(args).output() {
            Ok(output) if output.status.success() => return Ok(output),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(ThemeError::command(
                    *program,
                    format!("exited with {}: {}", output.status, stderr.trim()),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} not installed, trying next candidate", program);
                last_err = Some(ThemeError::command(*program, "not found in PATH"));
            }
            Err(e) => return Err(ThemeError::command(*program, e.to_string())),
        }
    }
    Err(last_err.unwrap_or_else(|| ThemeError::command("<none>", "no candidate programs")))
}
