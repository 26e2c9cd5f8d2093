/*!
Command-line tests for the `kde-theme` binary against a throwaway home directory.
*/

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// `kde-theme` with HOME pointed at `home` and the XDG overrides cleared
fn kde_theme(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kde-theme").unwrap();
    cmd.env("HOME", home)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env_remove("KDE_THEME_BACKUP_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn seed_home(home: &Path) {
    let config = home.join(".config");
    fs::create_dir_all(&config).unwrap();
    fs::write(config.join("kdeglobals"), "[General]\nColorScheme=BreezeDark\n").unwrap();
    fs::write(
        config.join("plasma-org.kde.plasma.desktop-appletsrc"),
        "[Containments][1]\nplugin=org.kde.panel\n",
    )
    .unwrap();
}

#[test]
fn test_list_empty_store() {
    let home = TempDir::new().unwrap();
    kde_theme(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_backup_then_list() {
    let home = TempDir::new().unwrap();
    seed_home(home.path());

    for name in ["zeta", "alpha"] {
        kde_theme(home.path())
            .args(["backup", name])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("Snapshot '{name}' saved")));
    }

    kde_theme(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout("alpha\nzeta\n");

    assert!(home.path().join("kde-theme-backups/alpha.tar.gz").is_file());
}

#[test]
fn test_duplicate_backup_fails() {
    let home = TempDir::new().unwrap();
    seed_home(home.path());

    kde_theme(home.path()).args(["backup", "mine"]).assert().success();
    kde_theme(home.path())
        .args(["backup", "mine"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    kde_theme(home.path())
        .args(["backup", "mine", "--force"])
        .assert()
        .success();
}

#[test]
fn test_invalid_name_is_rejected() {
    let home = TempDir::new().unwrap();
    kde_theme(home.path())
        .args(["backup", "my theme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid snapshot name"));
}

#[test]
fn test_restore_missing_snapshot_fails() {
    let home = TempDir::new().unwrap();
    for command in ["restore", "restore-layout", "restore-all"] {
        kde_theme(home.path())
            .args([command, "ghost"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }
}

#[test]
fn test_restore_layout_rewrites_layout_file() {
    let home = TempDir::new().unwrap();
    seed_home(home.path());
    let layout = home.path().join(".config/plasma-org.kde.plasma.desktop-appletsrc");

    kde_theme(home.path()).args(["backup", "panels"]).assert().success();
    fs::write(&layout, "broken").unwrap();

    kde_theme(home.path())
        .args(["restore-layout", "panels"])
        .assert()
        .success()
        .stdout(predicate::str::contains("panel-layout"));

    assert_eq!(
        fs::read_to_string(&layout).unwrap(),
        "[Containments][1]\nplugin=org.kde.panel\n"
    );
}

#[test]
fn test_root_flag_and_delete() {
    let home = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    seed_home(home.path());

    kde_theme(home.path())
        .args(["--root"])
        .arg(store.path())
        .args(["backup", "usb"])
        .assert()
        .success();
    assert!(store.path().join("usb").is_dir());

    kde_theme(home.path())
        .env("KDE_THEME_BACKUP_DIR", store.path())
        .args(["delete", "usb", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted"));
    assert!(!store.path().join("usb").exists());
    assert!(!store.path().join("usb.tar.gz").exists());
}

#[test]
fn test_delete_prompt_can_be_declined() {
    let home = TempDir::new().unwrap();
    seed_home(home.path());
    kde_theme(home.path()).args(["backup", "keep"]).assert().success();

    kde_theme(home.path())
        .args(["delete", "keep"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deletion cancelled"));
    assert!(home.path().join("kde-theme-backups/keep").is_dir());
}

#[test]
fn test_import_and_show() {
    let home = TempDir::new().unwrap();
    seed_home(home.path());
    kde_theme(home.path()).args(["backup", "shared"]).assert().success();
    let archive = home.path().join("kde-theme-backups/shared.tar.gz");

    let other = TempDir::new().unwrap();
    kde_theme(other.path())
        .arg("import")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported snapshot 'shared'"));

    kde_theme(other.path())
        .args(["show", "shared"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Name: shared"))
        .stdout(predicate::str::contains("Categories:"));
}
