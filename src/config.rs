//! Run configuration
//!
//! Read from `sigconform.toml`; every section and key is optional.
//!
//! ```toml
//! [catalog]
//! preset = "testing-library"      # "" starts from an empty catalog
//! declarations = ["decls/jest-dom.toml"]
//!
//! [evaluation]
//! parallel = true
//! workers = 0                     # 0 = one per CPU
//!
//! [markers]
//! prefixes = ["$ExpectError", "$FlowExpectedError"]
//!
//! [report]
//! show_passing = false
//!
//! [logging]
//! level = "warn"
//! ```
//!
//! Relative declaration paths are resolved against the directory holding the
//! configuration file.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::backend::builtin_catalog::{PRESETS, TESTING_LIBRARY};
use crate::fixture::DEFAULT_PREFIXES;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "sigconform.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read config '{}': {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config '{}': {}", path.display(), source)
            }
            ConfigError::Invalid(reason) => write!(f, "Invalid config: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub evaluation: EvaluationConfig,
    pub markers: MarkerConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Built-in preset to start from; empty for none
    pub preset: String,
    /// Declarations files merged over the preset, in order
    pub declarations: Vec<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            preset: TESTING_LIBRARY.to_string(),
            declarations: Vec::new(),
        }
    }
}

impl CatalogConfig {
    pub fn preset(&self) -> Option<&str> {
        (!self.preset.is_empty()).then_some(self.preset.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub parallel: bool,
    /// Worker threads for parallel evaluation; 0 means one per CPU
    pub workers: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            parallel: true,
            workers: 0,
        }
    }
}

impl EvaluationConfig {
    pub fn worker_count(&self) -> usize {
        match self.workers {
            0 => num_cpus::get(),
            n => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub prefixes: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        MarkerConfig {
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub show_passing: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

impl Config {
    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            for decl in &mut config.catalog.declarations {
                if decl.is_relative() {
                    *decl = base.join(&*decl);
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// `./sigconform.toml` when present, defaults otherwise
    pub fn discover() -> Result<Self, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(preset) = self.catalog.preset() {
            if !PRESETS.contains(&preset) {
                return Err(ConfigError::Invalid(format!(
                    "unknown preset '{}' (available: {})",
                    preset,
                    PRESETS.join(", ")
                )));
            }
        }
        if self.markers.prefixes.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "markers.prefixes must name at least one prefix".to_string(),
            ));
        }
        self.logging.level()?;
        Ok(())
    }
}
