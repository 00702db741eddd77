//! Configuration file handling for edgestag.
//!
//! Every section and field is optional; a missing file yields the defaults.
//!
//! ```toml
//! [edges]
//! sigma = 1.4142
//! threshold_high = 75
//! threshold_low = 25
//! smoothing = "separable"   # or "two_dimensional"
//! operator = "sobel"        # or "prewitt"
//!
//! [script]
//! ced_threshold_ratio = 3.0
//! seed = 357
//!
//! [output]
//! format = "ascii"          # or "binary"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::filters::edge::EdgeOptions;
use crate::filters::noise::DEFAULT_SEED;
use crate::pgm::PgmFormat;

/// Configuration file structure.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub edges: EdgeOptions,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptConfig {
    /// `ced` without an explicit high threshold uses `low * ratio`.
    #[serde(default = "default_ratio")]
    pub ced_threshold_ratio: f64,
    /// Seed of the noise generator.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        ScriptConfig {
            ced_threshold_ratio: default_ratio(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: PgmFormat,
}

fn default_ratio() -> f64 {
    3.0
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if no path is given or the file doesn't exist.
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) if p.exists() => p,
            Some(p) => {
                log::debug!("config '{}' not found, using defaults", p.display());
                return Ok(Config::default());
            }
            None => return Ok(Config::default()),
        };

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
