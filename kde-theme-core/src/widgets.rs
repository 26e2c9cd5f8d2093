/*!
Discovery of the plasmoids a saved layout refers to.

Panel and dock layouts are KConfig INI files where every applet and containment
group carries a `plugin=<id>` key. The restore engine diffs those identifiers
against the installed plasmoids before writing the layout back.
*/

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::{Result, ThemeError};

/// Whether a file name looks like a Plasma or Latte layout file
pub fn is_layout_file(file_name: &str) -> bool {
    file_name.ends_with("appletsrc") || file_name.ends_with(".layout.latte")
}

/// Extract plugin identifiers from the contents of a layout file
pub fn parse_plugin_ids(contents: &str) -> BTreeSet<String> {
    contents
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            (key.trim() == "plugin").then(|| value.trim())
        })
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collect plugin identifiers from every layout file under `root`
///
/// A missing `root` yields an empty set.
pub fn referenced_plugins(root: &Path) -> Result<BTreeSet<String>> {
    let mut ids = BTreeSet::new();
    if !root.exists() {
        return Ok(ids);
    }
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| ThemeError::io_at(root, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_layout_file(&name) {
            continue;
        }
        let bytes = fs::read(entry.path()).map_err(|e| ThemeError::io_at(entry.path(), e))?;
        let found = parse_plugin_ids(&String::from_utf8_lossy(&bytes));
        debug!("{} references {} plugins", entry.path().display(), found.len());
        ids.extend(found);
    }
    Ok(ids)
}

/// Plasmoid package identifiers installed under `dir` (one directory per package)
pub fn plasmoid_packages(dir: &Path) -> Result<BTreeSet<String>> {
    let mut ids = BTreeSet::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
        Err(e) => return Err(ThemeError::io_at(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| ThemeError::io_at(dir, e))?;
        if entry.path().is_dir() {
            ids.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(ids)
}

/// Compiled applet identifiers under a Qt plugin directory (`<id>.so` files)
pub fn applet_plugins(dir: &Path) -> Result<BTreeSet<String>> {
    let mut ids = BTreeSet::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
        Err(e) => return Err(ThemeError::io_at(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| ThemeError::io_at(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(id) = name.strip_suffix(".so") {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const APPLETSRC: &str = "\
[Containments][1]
activityId=
formfactor=2
plugin=org.kde.panel

[Containments][1][Applets][3]
immutability=1
plugin=org.kde.plasma.kickoff

[Containments][1][Applets][4]
plugin = org.kde.plasma.betterinlineclock

[Containments][1][Applets][4][Configuration]
pluginVersion=2
";

    #[test]
    fn test_parse_plugin_ids() {
        let ids = parse_plugin_ids(APPLETSRC);
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec![
                "org.kde.panel".to_string(),
                "org.kde.plasma.betterinlineclock".to_string(),
                "org.kde.plasma.kickoff".to_string(),
            ]
        );
    }

    #[test]
    fn test_layout_file_names() {
        assert!(is_layout_file("plasma-org.kde.plasma.desktop-appletsrc"));
        assert!(is_layout_file("My Layout.layout.latte"));
        assert!(!is_layout_file("plasmashellrc"));
        assert!(!is_layout_file("lattedockrc"));
    }

    #[test]
    fn test_referenced_plugins_walks_nested_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("config/latte")).unwrap();
        fs::write(root.join("config/plasma-org.kde.plasma.desktop-appletsrc"), APPLETSRC).unwrap();
        fs::write(
            root.join("config/latte/Dock.layout.latte"),
            "[Containments][9]\nplugin=org.kde.latte.containment\n",
        )
        .unwrap();
        fs::write(root.join("config/plasmashellrc"), "plugin=should.not.count\n").unwrap();

        let ids = referenced_plugins(root).unwrap();
        assert!(ids.contains("org.kde.latte.containment"));
        assert!(ids.contains("org.kde.plasma.kickoff"));
        assert!(!ids.contains("should.not.count"));
    }

    #[test]
    fn test_missing_roots_are_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(referenced_plugins(&tmp.path().join("nope")).unwrap().is_empty());
        assert!(plasmoid_packages(&tmp.path().join("nope")).unwrap().is_empty());
        assert!(applet_plugins(&tmp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_applet_plugins_strip_extension() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("org.kde.plasma.kickoff.so"), b"").unwrap();
        fs::write(tmp.path().join("README"), b"").unwrap();

        let ids = applet_plugins(tmp.path()).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["org.kde.plasma.kickoff".to_string()]);
    }
}
