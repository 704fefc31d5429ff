//! Write batching: groups the writes for a whole block of transaction
//! results into a single LMDB write transaction, amortising the cost of the
//! fsync that each commit performs.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! for result in block_results {
//!     batch.put_result(result)?;
//! }
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::RwTxn;

use txindex_store::HyperLogLog;
use txindex_types::{TxHash, TxResult};

use crate::environment::LmdbEnvironment;
use crate::keys::{decode_hash, event_key, position_key};
use crate::LmdbError;

/// A write batch over every index database.
pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
    observed: Vec<(String, String)>,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, LmdbError> {
        let txn = env.env().write_txn()?;
        Ok(Self {
            txn,
            env,
            observed: Vec::new(),
        })
    }

    fn load(&self, hash: &TxHash) -> Result<Option<TxResult>, LmdbError> {
        match self.env.tx_results_db.get(&self.txn, hash.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Drop a stored result and every index entry that points at it.
    fn remove(&mut self, hash: &TxHash, result: &TxResult) -> Result<(), LmdbError> {
        let (height, index) = result.position();
        self.env
            .height_db
            .delete(&mut self.txn, &position_key(height, index))?;
        for (tag, value) in result.indexed_attributes() {
            self.env
                .event_db
                .delete(&mut self.txn, &event_key(&tag, value, height, index))?;
        }
        self.env.tx_results_db.delete(&mut self.txn, hash.as_bytes())?;
        Ok(())
    }

    /// Store a result and its height and event index entries.
    ///
    /// Re-indexing a hash replaces its previous entry, and a position holds
    /// one transaction: whatever was stored at the same `(height, index)`
    /// under another hash is removed.
    pub fn put_result(&mut self, result: &TxResult) -> Result<TxHash, LmdbError> {
        let hash = txindex_crypto::tx_result_hash(result);
        let (height, index) = result.position();
        let pos_key = position_key(height, index);

        if let Some(old) = self.load(&hash)? {
            self.remove(&hash, &old)?;
        }
        let occupant = match self.env.height_db.get(&self.txn, &pos_key)? {
            Some(bytes) => Some(decode_hash(bytes)?),
            None => None,
        };
        if let Some(other) = occupant {
            if let Some(displaced) = self.load(&other)? {
                tracing::warn!(%other, height, index, "replacing transaction at occupied position");
                self.remove(&other, &displaced)?;
            }
        }

        let encoded = bincode::serialize(result)?;
        self.env
            .tx_results_db
            .put(&mut self.txn, hash.as_bytes(), &encoded)?;
        self.env
            .height_db
            .put(&mut self.txn, &pos_key, hash.as_bytes())?;

        for (tag, value) in result.indexed_attributes() {
            self.env.event_db.put(
                &mut self.txn,
                &event_key(&tag, value, height, index),
                hash.as_bytes(),
            )?;
            self.observed.push((tag, value.to_string()));
        }
        Ok(hash)
    }

    /// Persist a cardinality sketch for `tag`.
    pub fn put_sketch(&mut self, tag: &str, sketch: &HyperLogLog) -> Result<(), LmdbError> {
        let encoded = bincode::serialize(sketch)?;
        self.env
            .sketch_db
            .put(&mut self.txn, tag.as_bytes(), &encoded)?;
        Ok(())
    }

    /// Every `(tag, value)` pair written to the event index so far.
    pub fn observed(&self) -> &[(String, String)] {
        &self.observed
    }

    /// Commit all batched operations atomically.
    pub fn commit(self) -> Result<(), LmdbError> {
        self.txn.commit()?;
        Ok(())
    }
}
