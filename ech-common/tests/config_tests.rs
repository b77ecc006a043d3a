//! Unit tests for configuration loading and data folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate ECH_DATA_FOLDER are marked with #[serial].

use ech_common::config::{resolve_data_folder, TomlConfig, DATA_FOLDER_ENV};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_defaults_when_file_missing() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = TomlConfig::load_or_default(Some(&missing)).unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.session_idle_timeout_secs, 1800);
    assert_eq!(config.logging.level, "info");
    assert!(config.data_folder.is_none());
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "port = 9000\ndata_folder = \"/srv/ech\"\n").unwrap();

    let config = TomlConfig::load_or_default(Some(&path)).unwrap();
    assert_eq!(config.port, 9000);
    assert_eq!(config.data_folder, Some(PathBuf::from("/srv/ech")));
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_logging_section() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "port = \"not a number\"\n").unwrap();

    assert!(TomlConfig::load_or_default(Some(&path)).is_err());
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/ech-from-env");
    let config = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/ech-from-toml")),
        ..TomlConfig::default()
    };

    let resolved = resolve_data_folder(Some(Path::new("/tmp/ech-from-cli")), DATA_FOLDER_ENV, &config);
    assert_eq!(resolved, PathBuf::from("/tmp/ech-from-cli"));

    env::remove_var(DATA_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/ech-from-env");
    let config = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/ech-from-toml")),
        ..TomlConfig::default()
    };

    let resolved = resolve_data_folder(None, DATA_FOLDER_ENV, &config);
    assert_eq!(resolved, PathBuf::from("/tmp/ech-from-env"));

    env::remove_var(DATA_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(DATA_FOLDER_ENV);
    let config = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/ech-from-toml")),
        ..TomlConfig::default()
    };
    assert_eq!(
        resolve_data_folder(None, DATA_FOLDER_ENV, &config),
        PathBuf::from("/tmp/ech-from-toml")
    );

    let fallback = resolve_data_folder(None, DATA_FOLDER_ENV, &TomlConfig::default());
    assert!(!fallback.as_os_str().is_empty());
}
