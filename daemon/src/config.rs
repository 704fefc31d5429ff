//! Indexer configuration with TOML file support.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use txindex_store::{CardinalityOverlay, HyperLogLog};
use txindex_store_lmdb::StoreConfig;
use txindex_utils::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Configuration for the `txindex` tool.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB memory map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,

    /// "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter directive: "trace", "debug", "info", "warn", "error", or a
    /// full `tracing` filter such as "info,txindex_store_lmdb=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// HyperLogLog precision of the per-tag cardinality sketches (4..=16).
    #[serde(default = "default_sketch_precision")]
    pub sketch_precision: u8,

    #[serde(default = "default_high_cardinality_threshold")]
    pub high_cardinality_threshold: u64,

    /// Index entries scanned between two cancellation checks.
    #[serde(default = "default_cancel_check_interval")]
    pub cancel_check_interval: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./txindex_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_max_dbs() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sketch_precision() -> u8 {
    HyperLogLog::DEFAULT_PRECISION
}

fn default_high_cardinality_threshold() -> u64 {
    CardinalityOverlay::DEFAULT_HIGH_THRESHOLD
}

fn default_cancel_check_interval() -> usize {
    1024
}

// ── Impl ───────────────────────────────────────────────────────────────

impl IndexerConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_size_mb == 0 {
            return Err(ConfigError::Invalid {
                field: "map_size_mb",
                reason: "must be positive".into(),
            });
        }
        if !(HyperLogLog::MIN_PRECISION..=HyperLogLog::MAX_PRECISION)
            .contains(&self.sketch_precision)
        {
            return Err(ConfigError::Invalid {
                field: "sketch_precision",
                reason: format!(
                    "{} is outside {}..={}",
                    self.sketch_precision,
                    HyperLogLog::MIN_PRECISION,
                    HyperLogLog::MAX_PRECISION
                ),
            });
        }
        if self.cancel_check_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "cancel_check_interval",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// The subset handed to the LMDB store.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            map_size: self.map_size_mb * 1024 * 1024,
            max_dbs: self.max_dbs,
            sketch_precision: self.sketch_precision,
            high_cardinality_threshold: self.high_cardinality_threshold,
            cancel_check_interval: self.cancel_check_interval,
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            max_dbs: default_max_dbs(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            sketch_precision: default_sketch_precision(),
            high_cardinality_threshold: default_high_cardinality_threshold(),
            cancel_check_interval: default_cancel_check_interval(),
        }
    }
}
