//! Approximate distinct-value counting per indexed tag.
//!
//! The base store keeps one [`HyperLogLog`] per composite event tag and
//! feeds it every indexed value. The estimates tell the matcher which
//! conditions are the most selective, so it can drive a conjunctive match
//! from one narrow index scan instead of intersecting every index.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::StoreError;

/// Bounded-memory estimator of the number of distinct items seen.
pub trait CardinalitySketch {
    fn insert(&mut self, item: &[u8]);

    fn estimate(&self) -> u64;

    /// Fold `other` into `self`, so `self` estimates the union of both inputs.
    fn merge(&mut self, other: &Self) -> Result<(), StoreError>;
}

/// HyperLogLog with `2^precision` one-byte registers.
///
/// Relative standard error is about `1.04 / sqrt(2^precision)`, e.g. 1.6%
/// at the default precision of 12 (4 KiB per sketch).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperLogLog {
    precision: u8,
    registers: Vec<u8>,
}

impl HyperLogLog {
    pub const MIN_PRECISION: u8 = 4;
    pub const MAX_PRECISION: u8 = 16;
    pub const DEFAULT_PRECISION: u8 = 12;

    pub fn new(precision: u8) -> Result<Self, StoreError> {
        if !(Self::MIN_PRECISION..=Self::MAX_PRECISION).contains(&precision) {
            return Err(StoreError::InvalidSketch(format!(
                "precision {} outside {}..={}",
                precision,
                Self::MIN_PRECISION,
                Self::MAX_PRECISION
            )));
        }
        Ok(Self {
            precision,
            registers: vec![0; 1 << precision],
        })
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Check a sketch that came back from storage.
    pub fn validate(&self) -> Result<(), StoreError> {
        let expected = Self::new(self.precision)?.registers.len();
        if self.registers.len() != expected {
            return Err(StoreError::InvalidSketch(format!(
                "expected {} registers, found {}",
                expected,
                self.registers.len()
            )));
        }
        Ok(())
    }

    fn alpha(m: f64) -> f64 {
        match m as usize {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m),
        }
    }
}

impl Default for HyperLogLog {
    fn default() -> Self {
        Self {
            precision: Self::DEFAULT_PRECISION,
            registers: vec![0; 1 << Self::DEFAULT_PRECISION],
        }
    }
}

impl CardinalitySketch for HyperLogLog {
    fn insert(&mut self, item: &[u8]) {
        let hash = txindex_crypto::blake2b_64(item);
        let p = u32::from(self.precision);
        let idx = (hash >> (64 - p)) as usize;
        let rest = hash << p;
        // Rank of the first set bit in the remaining 64 - p bits.
        let rank = (rest.leading_zeros().min(64 - p) + 1) as u8;
        if rank > self.registers[idx] {
            self.registers[idx] = rank;
        }
    }

    fn estimate(&self) -> u64 {
        let m = self.registers.len() as f64;
        let mut sum = 0.0;
        let mut zeros = 0usize;
        for &r in &self.registers {
            sum += 2f64.powi(-i32::from(r));
            if r == 0 {
                zeros += 1;
            }
        }
        let raw = Self::alpha(m) * m * m / sum;
        let estimate = if raw <= 2.5 * m && zeros > 0 {
            // Linear counting is more accurate while many registers are empty.
            m * (m / zeros as f64).ln()
        } else {
            raw
        };
        estimate.round() as u64
    }

    fn merge(&mut self, other: &Self) -> Result<(), StoreError> {
        if self.precision != other.precision {
            return Err(StoreError::InvalidSketch(format!(
                "cannot merge precision {} into precision {}",
                other.precision, self.precision
            )));
        }
        for (mine, theirs) in self.registers.iter_mut().zip(&other.registers) {
            *mine = (*mine).max(*theirs);
        }
        Ok(())
    }
}

/// One sketch per composite tag, plus the threshold above which a tag is
/// considered high-cardinality.
#[derive(Clone, Debug)]
pub struct CardinalityOverlay {
    precision: u8,
    high_threshold: u64,
    sketches: HashMap<String, HyperLogLog>,
}

impl CardinalityOverlay {
    pub const DEFAULT_HIGH_THRESHOLD: u64 = 10_000;

    pub fn new(precision: u8, high_threshold: u64) -> Result<Self, StoreError> {
        // Fail early on a bad precision rather than on the first observation.
        HyperLogLog::new(precision)?;
        Ok(Self {
            precision,
            high_threshold,
            sketches: HashMap::new(),
        })
    }

    fn empty_sketch(&self) -> HyperLogLog {
        HyperLogLog {
            precision: self.precision,
            registers: vec![0; 1 << self.precision],
        }
    }

    /// Record that `value` was indexed under `tag`.
    pub fn observe(&mut self, tag: &str, value: &str) {
        if !self.sketches.contains_key(tag) {
            let empty = self.empty_sketch();
            self.sketches.insert(tag.to_string(), empty);
        }
        if let Some(sketch) = self.sketches.get_mut(tag) {
            sketch.insert(value.as_bytes());
        }
    }

    /// Updated copies of the sketches touched by `observations`, sorted by tag.
    ///
    /// The overlay itself is unchanged until the copies are handed to
    /// [`apply`](Self::apply), so a batch that fails to persist leaves no trace.
    pub fn stage<'a, I>(&self, observations: I) -> Vec<(String, HyperLogLog)>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut staged: BTreeMap<&'a str, HyperLogLog> = BTreeMap::new();
        for (tag, value) in observations {
            staged
                .entry(tag)
                .or_insert_with(|| {
                    self.sketches
                        .get(tag)
                        .cloned()
                        .unwrap_or_else(|| self.empty_sketch())
                })
                .insert(value.as_bytes());
        }
        staged
            .into_iter()
            .map(|(tag, sketch)| (tag.to_string(), sketch))
            .collect()
    }

    /// Install sketches returned by [`stage`](Self::stage).
    pub fn apply(&mut self, staged: Vec<(String, HyperLogLog)>) {
        self.sketches.extend(staged);
    }

    /// Estimated number of distinct values indexed under `tag`; 0 if never seen.
    pub fn estimate(&self, tag: &str) -> u64 {
        self.sketches.get(tag).map(|s| s.estimate()).unwrap_or(0)
    }

    pub fn is_high_cardinality(&self, tag: &str) -> bool {
        self.estimate(tag) >= self.high_threshold
    }

    pub fn high_threshold(&self) -> u64 {
        self.high_threshold
    }

    pub fn sketch(&self, tag: &str) -> Option<&HyperLogLog> {
        self.sketches.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.sketches.keys().map(String::as_str)
    }

    /// Load a persisted sketch, merging with anything already observed.
    pub fn restore(&mut self, tag: &str, sketch: HyperLogLog) -> Result<(), StoreError> {
        sketch.validate()?;
        match self.sketches.get_mut(tag) {
            Some(existing) => existing.merge(&sketch),
            None => {
                if sketch.precision != self.precision {
                    return Err(StoreError::InvalidSketch(format!(
                        "stored sketch for {} has precision {}, expected {}",
                        tag, sketch.precision, self.precision
                    )));
                }
                self.sketches.insert(tag.to_string(), sketch);
                Ok(())
            }
        }
    }
}

impl Default for CardinalityOverlay {
    fn default() -> Self {
        Self {
            precision: HyperLogLog::DEFAULT_PRECISION,
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
            sketches: HashMap::new(),
        }
    }
}
