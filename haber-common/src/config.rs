//! Configuration loading and config file resolution
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `HABER_CONFIG` environment variable
//! 3. `./haber.toml` in the working directory
//! 4. Platform config directory (`<config_dir>/haber/config.toml`)
//! 5. Compiled defaults (fallback)
//!
//! Explicitly named files (1, 2) must exist; discovered files (3, 4) are
//! optional. Every field has a default, so a partial file is valid.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "HABER_CONFIG";

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "haber.toml";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub model_path: PathBuf,
    /// PBKDF2 iterations for newly hashed passwords
    pub password_iterations: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            database_path: PathBuf::from("analizler.db"),
            model_path: PathBuf::from("models/model_boost.json"),
            password_iterations: 210_000,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `[training]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Newline-delimited JSON source
    pub lines_source: PathBuf,
    /// Single JSON array source
    pub array_source: PathBuf,
    pub output_dir: PathBuf,
    pub seed: u64,
    pub test_size: f64,
    /// Rows per class after oversampling (gradient-boosted variant)
    pub target_count: usize,
    /// Write a performance report for the linear and forest variants too
    pub write_report: bool,
    /// Optional JSON-lines export of the cleaned dataset
    pub export_cleaned: Option<PathBuf>,
    pub cv_folds: usize,
    pub forest_grid: ForestGridConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            lines_source: PathBuf::from("data/total.json"),
            array_source: PathBuf::from("data/TRNews.AANews.json"),
            output_dir: PathBuf::from("models"),
            seed: 42,
            test_size: 0.2,
            target_count: 5000,
            write_report: false,
            export_cleaned: None,
            cv_folds: 5,
            forest_grid: ForestGridConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(Error::Config(format!(
                "training.test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.target_count == 0 {
            return Err(Error::Config(
                "training.target_count must be positive".to_string(),
            ));
        }
        if self.cv_folds < 2 {
            return Err(Error::Config(format!(
                "training.cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        self.forest_grid.validate()
    }
}

/// `[training.forest_grid]` - hyperparameter grid for the random forest search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestGridConfig {
    pub max_features: Vec<usize>,
    pub ngram_range: Vec<(usize, usize)>,
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ForestGridConfig {
    fn default() -> Self {
        Self {
            max_features: vec![5000, 10000, 15000],
            ngram_range: vec![(1, 1), (1, 2)],
            n_estimators: vec![100, 200, 300],
            max_depth: vec![10, 20, 30],
            min_samples_split: vec![2, 5, 10],
            min_samples_leaf: vec![1, 2, 4],
        }
    }
}

impl ForestGridConfig {
    /// Number of grid points
    pub fn len(&self) -> usize {
        self.max_features.len()
            * self.ngram_range.len()
            * self.n_estimators.len()
            * self.max_depth.len()
            * self.min_samples_split.len()
            * self.min_samples_leaf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Config(
                "training.forest_grid must have at least one value per parameter".to_string(),
            ));
        }
        if let Some((lo, hi)) = self
            .ngram_range
            .iter()
            .find(|(lo, hi)| *lo == 0 || lo > hi)
        {
            return Err(Error::Config(format!(
                "training.forest_grid.ngram_range has invalid range ({}, {})",
                lo, hi
            )));
        }
        Ok(())
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive (overridden by `RUST_LOG`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.training.validate()?;
        Ok(config)
    }
}

/// Load configuration following the resolution priority order
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return TomlConfig::from_file(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return TomlConfig::from_file(Path::new(&path));
        }
    }

    // Priority 3 and 4: discovered files
    if let Some(path) = discover_config_file() {
        return TomlConfig::from_file(&path);
    }

    // Priority 5: compiled defaults
    warn!("No config file found, using compiled defaults");
    Ok(TomlConfig::default())
}

/// Find an optional config file in the working directory or platform config dir
fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join("haber").join("config.toml"))
        .filter(|path| path.exists())
}
