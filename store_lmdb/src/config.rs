//! Store tuning knobs.

use serde::{Deserialize, Serialize};

use txindex_store::{CardinalityOverlay, HyperLogLog};

/// Configuration for [`LmdbTxStore`](crate::LmdbTxStore).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum size of the memory map, in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Maximum number of named databases in the environment.
    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,

    /// HyperLogLog precision for the per-tag cardinality sketches.
    #[serde(default = "default_sketch_precision")]
    pub sketch_precision: u8,

    /// Estimated distinct values above which a tag counts as high-cardinality.
    #[serde(default = "default_high_cardinality_threshold")]
    pub high_cardinality_threshold: u64,

    /// Scanned index entries between two cancellation checks.
    #[serde(default = "default_cancel_check_interval")]
    pub cancel_check_interval: usize,
}

fn default_map_size() -> usize {
    1024 * 1024 * 1024
}

fn default_max_dbs() -> u32 {
    8
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

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            map_size: default_map_size(),
            max_dbs: default_max_dbs(),
            sketch_precision: default_sketch_precision(),
            high_cardinality_threshold: default_high_cardinality_threshold(),
            cancel_check_interval: default_cancel_check_interval(),
        }
    }
}
