//! Configuration management for the study importer
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (study-import.toml)
//! - Environment variables (STUDY_IMPORT__*)
//!
//! ## Example config file (study-import.toml):
//! ```toml
//! [store]
//! path = "pd_review.db"
//! collection = "studies"
//!
//! [discovery]
//! extension = "json"
//! skip_prefixes = ["drafts/"]
//!
//! [duplicates]
//! default_mode = "enhanced"
//! dataset_fields = ["source_dataset", "target_dataset"]
//!
//! [reports]
//! output_dir = "reports"
//! output_format = "pretty"
//!
//! [validation]
//! schema_path = "schemas/study.schema.json"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::duplicate::{DuplicateMode, DEFAULT_DATASET_FIELDS};

/// Main configuration for an import run
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImportConfig {
    /// Backing store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// File discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Duplicate detection settings
    #[serde(default)]
    pub duplicates: DuplicateConfig,

    /// Report output settings
    #[serde(default)]
    pub reports: ReportConfig,

    /// Schema validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Backing store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Table holding the imported studies
    #[serde(default = "default_collection")]
    pub collection: String,
}

/// File discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// File extension of study records (without the dot)
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Relative paths to ignore, compared component by component
    #[serde(default)]
    pub skip_prefixes: Vec<String>,
}

/// Duplicate detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateConfig {
    /// Mode used when none is given on the command line
    #[serde(default)]
    pub default_mode: DuplicateMode,

    /// Fields whose entries' names are compared in enhanced mode
    #[serde(default = "default_dataset_fields")]
    pub dataset_fields: Vec<String>,
}

/// Report output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory the report files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

/// Schema validation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationConfig {
    /// JSON Schema file replacing the built-in study schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,
}

// Default value functions
fn default_store_path() -> PathBuf {
    PathBuf::from("studies.db")
}

fn default_collection() -> String {
    "studies".to_string()
}

fn default_extension() -> String {
    "json".to_string()
}

fn default_dataset_fields() -> Vec<String> {
    DEFAULT_DATASET_FIELDS.iter().map(|s| s.to_string()).collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            skip_prefixes: Vec::new(),
        }
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            default_mode: DuplicateMode::Basic,
            dataset_fields: default_dataset_fields(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            output_format: OutputFormat::Pretty,
        }
    }
}

impl ImportConfig {
    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "study-import.toml",
            ".study-import.toml",
            "config/study-import.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "study-import") {
            let xdg_config = config_dir.config_dir().join("study-import.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // STUDY_IMPORT__STORE__PATH=... etc.
        builder = builder.add_source(
            Environment::with_prefix("STUDY_IMPORT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        std::fs::write(path, self.to_toml()?)
    }

    pub fn to_toml(&self) -> std::io::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
