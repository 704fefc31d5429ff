//! Generic conjunctive matcher over the LMDB indexes.
//!
//! Height conditions become key bounds. Event conditions are answered from
//! `event_index`, most selective first, as ranked by the cardinality
//! overlay. When the leading equality is on a high-cardinality tag (or it is
//! the only event condition) its scan drives the match and the remaining
//! conditions are evaluated on the loaded results; otherwise each event
//! condition is scanned and the position sets are intersected.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn};

use txindex_query::{Condition, Operand, Operator, Tag};
use txindex_store::context::CancelCheck;
use txindex_store::{CardinalityOverlay, SkipSet};
use txindex_types::{TxHash, TxResult};

use crate::environment::LmdbEnvironment;
use crate::keys::{
    decode_event_key, decode_hash, decode_position, event_tag_prefix, event_value_prefix,
    increment_prefix, position_key,
};
use crate::LmdbError;

type Positions = BTreeMap<(u64, u32), TxHash>;

/// Inclusive range of block heights a result may have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HeightRange {
    min: u64,
    max: u64,
}

impl HeightRange {
    pub(crate) fn all() -> Self {
        Self {
            min: 0,
            max: u64::MAX,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub(crate) fn contains(&self, height: u64) -> bool {
        self.min <= height && height <= self.max
    }

    pub(crate) fn restrict(&mut self, op: Operator, h: u64) {
        match op {
            Operator::Eq => {
                self.min = self.min.max(h);
                self.max = self.max.min(h);
            }
            Operator::Gt => match h.checked_add(1) {
                Some(next) => self.min = self.min.max(next),
                None => self.make_empty(),
            },
            Operator::Gte => self.min = self.min.max(h),
            Operator::Lt => match h.checked_sub(1) {
                Some(prev) => self.max = self.max.min(prev),
                None => self.make_empty(),
            },
            Operator::Lte => self.max = self.max.min(h),
            Operator::Contains | Operator::Exists => {}
        }
    }

    fn make_empty(&mut self) {
        self.min = 1;
        self.max = 0;
    }

    /// Key bounds of this range appended to `prefix`.
    fn key_bounds(&self, prefix: &[u8]) -> (Vec<u8>, Option<Vec<u8>>) {
        let mut lower = prefix.to_vec();
        lower.extend_from_slice(&position_key(self.min, 0));
        let upper = match self.max.checked_add(1) {
            Some(next) => {
                let mut upper = prefix.to_vec();
                upper.extend_from_slice(&position_key(next, 0));
                Some(upper)
            }
            None => {
                let mut upper = prefix.to_vec();
                increment_prefix(&mut upper);
                (!upper.is_empty()).then_some(upper)
            }
        };
        (lower, upper)
    }
}

/// How the conditions of one search are going to be answered.
pub(crate) struct Plan<'q> {
    pub(crate) heights: HeightRange,
    /// Event conditions, most selective first.
    pub(crate) indexed: Vec<&'q Condition>,
    /// Conditions only checkable on a loaded result.
    pub(crate) residual: Vec<&'q Condition>,
    /// Whether the first indexed condition drives the whole match.
    pub(crate) drive: bool,
}

fn is_exact_value(cond: &Condition) -> bool {
    cond.op() == Operator::Eq && matches!(cond.operand(), Some(Operand::Str(_)))
}

pub(crate) fn plan<'q>(
    conditions: &'q [Condition],
    skip: &SkipSet,
    overlay: &CardinalityOverlay,
) -> Plan<'q> {
    let mut heights = HeightRange::all();
    let mut indexed = Vec::new();
    let mut residual = Vec::new();

    for cond in conditions {
        let skipped = skip.is_skipped(cond);
        match cond.tag() {
            Tag::Height => {
                let bound = cond.operand().and_then(Operand::as_height);
                match (bound, cond.op()) {
                    (Some(h), op) if op == Operator::Eq || op.is_range() => {
                        heights.restrict(op, h)
                    }
                    _ if skipped => {}
                    _ => residual.push(cond),
                }
            }
            _ if skipped => {}
            Tag::Hash => residual.push(cond),
            Tag::Event(_) => indexed.push(cond),
        }
    }

    indexed.sort_by_key(|c| {
        let class = if is_exact_value(c) { 0 } else { 1 };
        (class, Reverse(overlay.estimate(c.tag().as_str())))
    });

    let drive = match indexed.first() {
        Some(first) => {
            indexed.len() == 1
                || (is_exact_value(first) && overlay.is_high_cardinality(first.tag().as_str()))
        }
        None => false,
    };

    Plan {
        heights,
        indexed,
        residual,
        drive,
    }
}

/// Visit every entry in `[lower, upper)`. Returns `false` if cancelled.
fn scan_range(
    db: &Database<Bytes, Bytes>,
    rtxn: &RoTxn,
    lower: &[u8],
    upper: Option<&[u8]>,
    check: &mut CancelCheck<'_>,
    mut visit: impl FnMut(&[u8], &[u8]) -> Result<(), LmdbError>,
) -> Result<bool, LmdbError> {
    let upper_bound = match upper {
        Some(u) => Bound::Excluded(u),
        None => Bound::Unbounded,
    };
    let bounds = (Bound::Included(lower), upper_bound);
    for entry in db.range(rtxn, &bounds)? {
        if check.tick() {
            return Ok(false);
        }
        let (key, value) = entry?;
        visit(key, value)?;
    }
    Ok(true)
}

/// Positions of every result whose event attributes satisfy `cond`.
fn scan_condition(
    env: &LmdbEnvironment,
    rtxn: &RoTxn,
    cond: &Condition,
    heights: &HeightRange,
    check: &mut CancelCheck<'_>,
) -> Result<Option<Positions>, LmdbError> {
    let tag = cond.tag().as_str();
    let tag_prefix = event_tag_prefix(tag);
    let (lower, upper) = match cond.operand() {
        Some(Operand::Str(value)) if cond.op() == Operator::Eq => {
            heights.key_bounds(&event_value_prefix(tag, value))
        }
        _ => {
            let mut upper = tag_prefix.clone();
            increment_prefix(&mut upper);
            (tag_prefix.clone(), (!upper.is_empty()).then_some(upper))
        }
    };

    let mut found = Positions::new();
    let completed = scan_range(
        &env.event_db,
        rtxn,
        &lower,
        upper.as_deref(),
        check,
        |key, value| {
            let (stored, height, index) = decode_event_key(&tag_prefix, key)?;
            if heights.contains(height) && cond.matches_value(&stored) {
                found.insert((height, index), decode_hash(value)?);
            }
            Ok(())
        },
    )?;
    Ok(completed.then_some(found))
}

/// Positions of every result within `heights`.
fn scan_heights(
    env: &LmdbEnvironment,
    rtxn: &RoTxn,
    heights: &HeightRange,
    check: &mut CancelCheck<'_>,
) -> Result<Option<Positions>, LmdbError> {
    let (lower, upper) = heights.key_bounds(&[]);
    let mut found = Positions::new();
    let completed = scan_range(
        &env.height_db,
        rtxn,
        &lower,
        upper.as_deref(),
        check,
        |key, value| {
            found.insert(decode_position(key)?, decode_hash(value)?);
            Ok(())
        },
    )?;
    Ok(completed.then_some(found))
}

fn load(env: &LmdbEnvironment, rtxn: &RoTxn, hash: &TxHash) -> Result<TxResult, LmdbError> {
    let bytes = env
        .tx_results_db
        .get(rtxn, hash.as_bytes())?
        .ok_or_else(|| LmdbError::Corruption(format!("index points at missing result {}", hash)))?;
    Ok(bincode::deserialize(bytes)?)
}

/// Run a plan. `Ok(None)` means the search was cancelled.
pub(crate) fn execute(
    env: &LmdbEnvironment,
    rtxn: &RoTxn,
    plan: &Plan<'_>,
    check: &mut CancelCheck<'_>,
) -> Result<Option<Vec<TxResult>>, LmdbError> {
    if plan.heights.is_empty() {
        return Ok(Some(Vec::new()));
    }

    let (candidates, to_check): (Positions, Vec<&Condition>) = match plan.indexed.split_first() {
        None => match scan_heights(env, rtxn, &plan.heights, check)? {
            Some(found) => (found, plan.residual.clone()),
            None => return Ok(None),
        },
        Some((first, rest)) if plan.drive => {
            let Some(found) = scan_condition(env, rtxn, first, &plan.heights, check)? else {
                return Ok(None);
            };
            let mut to_check = rest.to_vec();
            to_check.extend(plan.residual.iter().copied());
            (found, to_check)
        }
        Some((first, rest)) => {
            let Some(mut found) = scan_condition(env, rtxn, first, &plan.heights, check)? else {
                return Ok(None);
            };
            for cond in rest {
                if found.is_empty() {
                    break;
                }
                let Some(next) = scan_condition(env, rtxn, cond, &plan.heights, check)? else {
                    return Ok(None);
                };
                found.retain(|pos, _| next.contains_key(pos));
            }
            (found, plan.residual.clone())
        }
    };

    let mut results = Vec::with_capacity(candidates.len());
    for hash in candidates.values() {
        if check.tick() {
            return Ok(None);
        }
        let result = load(env, rtxn, hash)?;
        if to_check.iter().all(|c| c.matches_tx(hash, &result)) {
            results.push(result);
        }
    }
    Ok(Some(results))
}
