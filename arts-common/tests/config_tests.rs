//! Unit tests for configuration loading and graceful degradation
//!
//! Tests cover:
//! - Missing TOML files do not cause termination
//! - Explicit config paths must exist
//! - Priority order CLI > environment > TOML > default
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate ARTS_* variables are marked with #[serial].

use arts_common::config::{
    resolve_path, TomlConfig, CONFIG_ENV_VAR, MAIN_DATASET_ENV_VAR, OUTPUT_DIR_ENV_VAR,
};
use arts_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_load_from_explicit_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("arts.toml");
    std::fs::write(
        &config_path,
        "main_dataset = \"/data/main.geojson\"\nprune_false_negatives = true\n",
    )
    .unwrap();

    let config = TomlConfig::load(Some(&config_path)).unwrap();
    assert_eq!(config.main_dataset, Some(PathBuf::from("/data/main.geojson")));
    assert!(config.prune_false_negatives);
}

#[test]
#[serial]
fn test_explicit_missing_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let result = TomlConfig::load(Some(&missing));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_config_path_used() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("env.toml");
    std::fs::write(&config_path, "demo = true\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &config_path);
    let config = TomlConfig::load(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert!(config.demo);
}

#[test]
#[serial]
fn test_malformed_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    std::fs::write(&config_path, "demo = [unterminated").unwrap();

    let result = TomlConfig::load(Some(&config_path));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(MAIN_DATASET_ENV_VAR, "/env/main.geojson");

    let resolved = resolve_path(
        None,
        MAIN_DATASET_ENV_VAR,
        Some(Path::new("/toml/main.geojson")),
        Path::new("main.geojson"),
    );
    assert_eq!(resolved, PathBuf::from("/env/main.geojson"));

    env::remove_var(MAIN_DATASET_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_beats_env_var() {
    env::set_var(OUTPUT_DIR_ENV_VAR, "/env/out");

    let resolved = resolve_path(
        Some(Path::new("/cli/out")),
        OUTPUT_DIR_ENV_VAR,
        None,
        Path::new("."),
    );
    assert_eq!(resolved, PathBuf::from("/cli/out"));

    env::remove_var(OUTPUT_DIR_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_var_ignored() {
    env::set_var(OUTPUT_DIR_ENV_VAR, "  ");

    let resolved = resolve_path(None, OUTPUT_DIR_ENV_VAR, None, Path::new("."));
    assert_eq!(resolved, PathBuf::from("."));

    env::remove_var(OUTPUT_DIR_ENV_VAR);
}

#[test]
#[serial]
fn test_locate_prefers_cli_over_env() {
    let temp_dir = TempDir::new().unwrap();
    let cli_path = temp_dir.path().join("cli.toml");
    let env_path = temp_dir.path().join("env.toml");

    env::set_var(CONFIG_ENV_VAR, &env_path);
    let from_cli = TomlConfig::locate(Some(&cli_path));
    let from_env = TomlConfig::locate(None);
    env::remove_var(CONFIG_ENV_VAR);

    // Explicit paths are returned even when missing; reading them reports the error
    assert_eq!(from_cli, Some(cli_path));
    assert_eq!(from_env, Some(env_path));
}
