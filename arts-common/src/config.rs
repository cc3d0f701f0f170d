//! Configuration loading and path resolution
//!
//! Two sources feed a run:
//! 1. **TOML file**: dataset locations, output file names, logging, flags
//! 2. **Command line / environment**: per-run overrides
//!
//! # Resolution Priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and built-in
//! defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ARTS_CONFIG";

/// Environment variable overriding the main dataset path
pub const MAIN_DATASET_ENV_VAR: &str = "ARTS_MAIN_DATASET";

/// Environment variable overriding the output directory
pub const OUTPUT_DIR_ENV_VAR: &str = "ARTS_OUTPUT_DIR";

/// Configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Path to the main dataset file
    #[serde(default)]
    pub main_dataset: Option<PathBuf>,

    /// Directory receiving review, side and output files
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Dry-run: suppress file writes and completeness failures
    #[serde(default)]
    pub demo: bool,

    /// Remove main-dataset negatives listed as false negatives before appending
    #[serde(default)]
    pub prune_false_negatives: bool,

    /// Input column-naming format tag (`geojson` or `shapefile`)
    #[serde(default)]
    pub input_format: Option<String>,

    /// New metadata columns declared by the contributor (must be present)
    #[serde(default)]
    pub declared_columns: Vec<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Output file names (optional)
    #[serde(default)]
    pub files: FileNames,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// File names written into the output directory
#[derive(Debug, Clone, Deserialize)]
pub struct FileNames {
    /// Overlapping features needing human review
    #[serde(default = "default_review_file")]
    pub review: String,

    /// Features whose overlaps are not fully classified
    #[serde(default = "default_incomplete_file")]
    pub incomplete: String,

    /// Standalone formatted batch
    #[serde(default = "default_output_file")]
    pub output: String,
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            review: default_review_file(),
            incomplete: default_incomplete_file(),
            output: default_output_file(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_review_file() -> String {
    "overlapping_features.geojson".to_string()
}

fn default_incomplete_file() -> String {
    "incomplete_classifications.geojson".to_string()
}

fn default_output_file() -> String {
    "formatted_batch.geojson".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from an explicit file path
    ///
    /// Unlike [`TomlConfig::load`], a missing explicit file is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Config file to read, following the file location priority
    ///
    /// 1. `cli_path`
    /// 2. `ARTS_CONFIG` environment variable
    /// 3. Platform config directory (`<config_dir>/arts/config.toml`), if it exists
    ///
    /// `None` means built-in defaults. Nothing is logged, so callers may
    /// locate and read the file before a subscriber is installed.
    pub fn locate(cli_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = cli_path {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }

        default_config_path().filter(|path| path.exists())
    }

    /// Locate and load configuration, falling back to built-in defaults
    ///
    /// An explicit path (CLI or `ARTS_CONFIG`) must exist.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match Self::locate(cli_path) {
            Some(path) => {
                let config = Self::from_file(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Platform default configuration file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("arts").join("config.toml"))
}

/// Resolve a path following the CLI > environment > TOML > default priority
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
    default: &Path,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    // Priority 4: compiled default
    default.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.main_dataset.is_none());
        assert!(!config.demo);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.files.review, "overlapping_features.geojson");
        assert_eq!(config.files.incomplete, "incomplete_classifications.geojson");
    }

    #[test]
    fn test_full_config_parses() {
        let config = TomlConfig::from_toml_str(
            r#"
            main_dataset = "/data/arts/main.geojson"
            output_dir = "/data/arts/out"
            demo = true
            prune_false_negatives = true
            input_format = "shapefile"
            declared_columns = ["HeadwallHeight"]

            [logging]
            level = "debug"

            [files]
            review = "review.geojson"
            "#,
        )
        .unwrap();

        assert_eq!(config.main_dataset, Some(PathBuf::from("/data/arts/main.geojson")));
        assert!(config.demo);
        assert!(config.prune_false_negatives);
        assert_eq!(config.input_format.as_deref(), Some("shapefile"));
        assert_eq!(config.declared_columns, vec!["HeadwallHeight".to_string()]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.files.review, "review.geojson");
        assert_eq!(config.files.output, "formatted_batch.geojson");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = TomlConfig::from_toml_str("main_datasets = \"typo\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_cli_arg_wins() {
        let resolved = resolve_path(
            Some(Path::new("/cli/main.geojson")),
            "ARTS_TEST_UNSET_VARIABLE",
            Some(Path::new("/toml/main.geojson")),
            Path::new("main.geojson"),
        );
        assert_eq!(resolved, PathBuf::from("/cli/main.geojson"));
    }

    #[test]
    fn test_toml_then_default() {
        let resolved = resolve_path(
            None,
            "ARTS_TEST_UNSET_VARIABLE",
            Some(Path::new("/toml/main.geojson")),
            Path::new("main.geojson"),
        );
        assert_eq!(resolved, PathBuf::from("/toml/main.geojson"));

        let resolved = resolve_path(None, "ARTS_TEST_UNSET_VARIABLE", None, Path::new("main.geojson"));
        assert_eq!(resolved, PathBuf::from("main.geojson"));
    }
}
