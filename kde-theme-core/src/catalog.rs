/*!
Static catalog of the configuration that makes up a theme or a layout snapshot.

Each category names one or more locations relative to a base directory. The
same relative path is used inside the snapshot (under `<tag>/<base>/`) and on
the live system, so a snapshot directory mirrors its restore targets.
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::Settings;

/// Which half of the desktop configuration a category belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryTag {
    Theme,
    Layout,
}

impl CategoryTag {
    /// Directory name used for this tag inside a snapshot
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryTag::Theme => "theme",
            CategoryTag::Layout => "layout",
        }
    }
}

impl fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base directory a catalog location is relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseDir {
    Home,
    Config,
    Data,
}

impl BaseDir {
    /// Directory name used for this base inside a snapshot
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseDir::Home => "home",
            BaseDir::Config => "config",
            BaseDir::Data => "data",
        }
    }

    /// Resolve the base against the configured user directories
    pub fn resolve<'a>(&self, settings: &'a Settings) -> &'a Path {
        match self {
            BaseDir::Home => &settings.home_dir,
            BaseDir::Config => &settings.config_dir,
            BaseDir::Data => &settings.data_dir,
        }
    }
}

/// A single file or directory belonging to a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub base: BaseDir,
    pub relative: &'static str,
}

impl Location {
    const fn config(relative: &'static str) -> Self {
        Self { base: BaseDir::Config, relative }
    }

    const fn data(relative: &'static str) -> Self {
        Self { base: BaseDir::Data, relative }
    }

    const fn home(relative: &'static str) -> Self {
        Self { base: BaseDir::Home, relative }
    }

    /// Live path of this location for the given user directories
    pub fn live_path(&self, settings: &Settings) -> PathBuf {
        self.base.resolve(settings).join(self.relative)
    }

    /// Path of this location inside a snapshot directory
    pub fn snapshot_path(&self, snapshot_dir: &Path, tag: CategoryTag) -> PathBuf {
        snapshot_dir
            .join(tag.as_str())
            .join(self.base.as_str())
            .join(self.relative)
    }
}

/// A logical category of desktop configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryEntry {
    pub name: &'static str,
    pub tag: CategoryTag,
    pub locations: &'static [Location],
}

/// Plasma desktop containment layout file holding panels and widgets
pub const APPLETS_RC: &str = "plasma-org.kde.plasma.desktop-appletsrc";

/// Category holding locally installed plasmoid packages
pub const PLASMOIDS_CATEGORY: &str = "plasmoids";

static CATALOG: &[CategoryEntry] = &[
    CategoryEntry {
        name: "global-theme",
        tag: CategoryTag::Theme,
        locations: &[
            Location::data("plasma/look-and-feel"),
            Location::data("plasma/desktoptheme"),
            Location::config("plasmarc"),
        ],
    },
    CategoryEntry {
        name: "plasma-config",
        tag: CategoryTag::Theme,
        locations: &[
            Location::config("kdeglobals"),
            Location::config("kwinrc"),
            Location::config("kcminputrc"),
            Location::config("ksplashrc"),
            Location::config("gtk-3.0/settings.ini"),
            Location::config("gtk-4.0/settings.ini"),
        ],
    },
    CategoryEntry {
        name: "window-decorations",
        tag: CategoryTag::Theme,
        locations: &[Location::data("aurorae")],
    },
    CategoryEntry {
        name: "icons",
        tag: CategoryTag::Theme,
        locations: &[Location::data("icons"), Location::home(".icons")],
    },
    CategoryEntry {
        name: "color-schemes",
        tag: CategoryTag::Theme,
        locations: &[Location::data("color-schemes")],
    },
    CategoryEntry {
        name: "wallpapers",
        tag: CategoryTag::Theme,
        locations: &[Location::data("wallpapers")],
    },
    CategoryEntry {
        name: "kvantum",
        tag: CategoryTag::Theme,
        locations: &[Location::config("Kvantum")],
    },
    CategoryEntry {
        name: "panel-layout",
        tag: CategoryTag::Layout,
        locations: &[Location::config(APPLETS_RC), Location::config("plasmashellrc")],
    },
    CategoryEntry {
        name: PLASMOIDS_CATEGORY,
        tag: CategoryTag::Layout,
        locations: &[Location::data("plasma/plasmoids")],
    },
    CategoryEntry {
        name: "latte-dock",
        tag: CategoryTag::Layout,
        locations: &[Location::config("latte"), Location::config("lattedockrc")],
    },
];

/// All catalog categories, theme entries first
pub fn categories() -> &'static [CategoryEntry] {
    CATALOG
}

/// Look up a category by name
pub fn find(name: &str) -> Option<&'static CategoryEntry> {
    CATALOG.iter().find(|c| c.name == name)
}

/// Which categories a restore touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreMode {
    Theme,
    Layout,
    All,
}

impl RestoreMode {
    /// Whether categories with `tag` take part in this mode
    pub fn includes(&self, tag: CategoryTag) -> bool {
        match self {
            RestoreMode::Theme => tag == CategoryTag::Theme,
            RestoreMode::Layout => tag == CategoryTag::Layout,
            RestoreMode::All => true,
        }
    }

    /// Whether this mode applies the recorded global theme
    pub fn applies_theme(&self) -> bool {
        self.includes(CategoryTag::Theme)
    }

    /// Whether this mode restores panel and widget layout
    pub fn restores_layout(&self) -> bool {
        self.includes(CategoryTag::Layout)
    }

    /// Catalog entries participating in this mode, in catalog order
    pub fn select(&self) -> impl Iterator<Item = &'static CategoryEntry> + '_ {
        categories().iter().filter(move |c| self.includes(c.tag))
    }
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RestoreMode::Theme => "theme",
            RestoreMode::Layout => "layout",
            RestoreMode::All => "all",
        };
        f.write_str(s)
    }
}

impl FromStr for RestoreMode {
    type Err = crate::ThemeError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "theme" => Ok(RestoreMode::Theme),
            "layout" => Ok(RestoreMode::Layout),
            "all" => Ok(RestoreMode::All),
            other => Err(crate::ThemeError::validation(format!(
                "unknown restore mode '{other}' (expected theme, layout or all)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_category_names_are_unique() {
        let names: HashSet<_> = categories().iter().map(|c| c.name).collect();
        assert_eq!(names.len(), categories().len());
    }

    #[test]
    fn test_locations_are_relative_and_unique() {
        let mut seen = HashSet::new();
        for entry in categories() {
            assert!(!entry.locations.is_empty(), "{} has no locations", entry.name);
            for loc in entry.locations {
                assert!(!Path::new(loc.relative).is_absolute());
                assert!(!loc.relative.contains(".."));
                assert!(seen.insert((loc.base, loc.relative)), "duplicate {:?}", loc);
            }
        }
    }

    #[test]
    fn test_theme_entries_precede_layout_entries() {
        let tags: Vec<_> = categories().iter().map(|c| c.tag).collect();
        let first_layout = tags.iter().position(|t| *t == CategoryTag::Layout).unwrap();
        assert!(tags[first_layout..].iter().all(|t| *t == CategoryTag::Layout));
    }

    #[test]
    fn test_mode_selection() {
        let theme: Vec<_> = RestoreMode::Theme.select().map(|c| c.name).collect();
        let layout: Vec<_> = RestoreMode::Layout.select().map(|c| c.name).collect();
        let all: Vec<_> = RestoreMode::All.select().map(|c| c.name).collect();

        assert!(theme.contains(&"icons"));
        assert!(theme.contains(&"kvantum"));
        assert!(!theme.contains(&"panel-layout"));
        assert_eq!(layout, vec!["panel-layout", "plasmoids", "latte-dock"]);
        assert_eq!(all.len(), theme.len() + layout.len());
    }

    #[test]
    fn test_location_paths_mirror_targets() {
        let settings = Settings::with_home("/home/alice");
        let loc = find("panel-layout").unwrap().locations[0];

        assert_eq!(
            loc.live_path(&settings),
            PathBuf::from("/home/alice/.config/plasma-org.kde.plasma.desktop-appletsrc")
        );
        assert_eq!(
            loc.snapshot_path(Path::new("/backups/mine"), CategoryTag::Layout),
            PathBuf::from("/backups/mine/layout/config/plasma-org.kde.plasma.desktop-appletsrc")
        );
    }

    #[test]
    fn test_restore_mode_parsing() {
        assert_eq!("theme".parse::<RestoreMode>().unwrap(), RestoreMode::Theme);
        assert_eq!("all".parse::<RestoreMode>().unwrap(), RestoreMode::All);
        assert!("everything".parse::<RestoreMode>().is_err());
        assert!(RestoreMode::All.applies_theme());
        assert!(!RestoreMode::Layout.applies_theme());
        assert!(RestoreMode::Layout.restores_layout());
    }
}
