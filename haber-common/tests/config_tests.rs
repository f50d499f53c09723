//! Unit tests for configuration loading
//!
//! Tests cover:
//! - Compiled defaults when no config file is found
//! - Resolution priority (CLI argument over environment variable)
//! - Partial files fall back to defaults field by field
//! - Validation of training parameters
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate HABER_CONFIG are marked with #[serial].

use haber_common::config::{load_config, TomlConfig, CONFIG_ENV_VAR};
use haber_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

fn write_config(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_compiled_defaults() {
    let config = TomlConfig::default();

    assert_eq!(config.server.port, 5000);
    assert_eq!(config.server.bind_addr(), "127.0.0.1:5000");
    assert_eq!(config.server.database_path, PathBuf::from("analizler.db"));
    assert_eq!(config.training.seed, 42);
    assert_eq!(config.training.target_count, 5000);
    assert_eq!(config.training.cv_folds, 5);
    assert_eq!(config.training.forest_grid.len(), 3 * 2 * 3 * 3 * 3 * 3);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_partial_file_keeps_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        [server]
        port = 8080

        [training]
        target_count = 1200
        "#,
    )
    .unwrap();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.training.target_count, 1200);
    assert_eq!(config.training.test_size, 0.2);
}

#[test]
fn test_forest_grid_override() {
    let config = TomlConfig::from_toml_str(
        r#"
        [training.forest_grid]
        max_features = [500]
        ngram_range = [[1, 1]]
        n_estimators = [10, 20]
        max_depth = [5]
        min_samples_split = [2]
        min_samples_leaf = [1]
        "#,
    )
    .unwrap();

    let grid = &config.training.forest_grid;
    assert_eq!(grid.ngram_range, vec![(1, 1)]);
    assert_eq!(grid.len(), 2);
}

#[test]
fn test_invalid_test_size_rejected() {
    let result = TomlConfig::from_toml_str(
        r#"
        [training]
        test_size = 1.5
        "#,
    );

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_ngram_range_rejected() {
    let result = TomlConfig::from_toml_str(
        r#"
        [training.forest_grid]
        ngram_range = [[2, 1]]
        "#,
    );

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_toml_is_error() {
    let result = TomlConfig::from_toml_str("[server\nport = ");
    assert!(matches!(result, Err(Error::Toml(_))));
}

#[test]
#[serial]
fn test_cli_argument_takes_precedence_over_env() {
    let dir = tempfile::tempdir().unwrap();
    let cli = write_config(&dir, "cli.toml", "[server]\nport = 7001\n");
    let from_env = write_config(&dir, "env.toml", "[server]\nport = 7002\n");

    env::set_var(CONFIG_ENV_VAR, &from_env);
    let config = load_config(Some(&cli)).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.server.port, 7001);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    let dir = tempfile::tempdir().unwrap();
    let from_env = write_config(&dir, "env.toml", "[server]\nport = 7002\n");

    env::set_var(CONFIG_ENV_VAR, &from_env);
    let config = load_config(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.server.port, 7002);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let result = load_config(Some(std::path::Path::new("/nonexistent/haber.toml")));

    assert!(matches!(result, Err(Error::Config(_))));
}
