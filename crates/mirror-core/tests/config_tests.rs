//! Watch configuration loading

use std::path::PathBuf;

use mirror_core::{Error, RenamePolicy, WatchConfig, WatchSetting};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[rstest]
#[case("config.yml", "- path: ./notes\n  commands:\n    - git status\n")]
#[case("config.yaml", "- path: ./notes\n  commands: [git status]\n")]
#[case("config.json", r#"[{"path": "./notes", "commands": ["git status"]}]"#)]
#[case("config.toml", "[[watch]]\npath = \"./notes\"\ncommands = [\"git status\"]\n")]
fn every_format_yields_the_same_setting(#[case] name: &str, #[case] content: &str) {
    let dir = TempDir::new().unwrap();
    let config = WatchConfig::load(write(&dir, name, content)).unwrap();

    assert_eq!(
        config.first(),
        Some(&WatchSetting::new("./notes").with_commands(vec!["git status".to_string()]))
    );
}

#[test]
fn only_first_entry_is_used() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.yml", "- path: first\n- path: second\n");

    let config = WatchConfig::load(path).unwrap();
    assert_eq!(config.settings.len(), 2);
    assert_eq!(config.into_first().unwrap().path, PathBuf::from("first"));
}

#[test]
fn optional_fields_are_read() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "config.yml",
        "- path: notes\n  backup: /var/backups/notes\n  temp_markers: ['~', '#']\n  rename_policy: log-as-remove\n",
    );

    let setting = WatchConfig::load(path).unwrap().into_first().unwrap();
    assert_eq!(setting.backup, PathBuf::from("/var/backups/notes"));
    assert_eq!(setting.temp_markers, vec!['~', '#']);
    assert_eq!(setting.rename_policy, RenamePolicy::LogAsRemove);
}

#[test]
fn empty_list_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.json", "[]");

    assert!(matches!(WatchConfig::load(path), Err(Error::EmptyConfig { .. })));
}

#[test]
fn missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = WatchConfig::load(dir.path().join("absent.yml"));

    assert!(matches!(result, Err(Error::Fs(_))));
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.ini", "path=notes");

    assert!(matches!(
        WatchConfig::load(path),
        Err(Error::Fs(mirror_fs::Error::UnsupportedFormat { .. }))
    ));
}
