//! LMDB implementation of TxStore and TxIndexer.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use txindex_query::Condition;
use txindex_store::{
    CardinalityOverlay, HyperLogLog, SearchContext, SkipSet, StoreError, TxIndexer, TxStore,
};
use txindex_types::{TxHash, TxResult};

use crate::environment::LmdbEnvironment;
use crate::{matcher, LmdbError, StoreConfig};

/// Transaction results plus height and event indexes in one LMDB environment.
pub struct LmdbTxStore {
    env: LmdbEnvironment,
    overlay: RwLock<CardinalityOverlay>,
    cancel_check_interval: usize,
}

impl LmdbTxStore {
    /// Open (or create) a store under `path` and reload its cardinality sketches.
    pub fn open(path: &Path, config: &StoreConfig) -> Result<Self, StoreError> {
        let env = LmdbEnvironment::open(path, config.max_dbs, config.map_size)?;
        let mut overlay =
            CardinalityOverlay::new(config.sketch_precision, config.high_cardinality_threshold)?;

        let rtxn = env.env().read_txn().map_err(LmdbError::from)?;
        let mut restored = 0usize;
        for entry in env.sketch_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, value) = entry.map_err(LmdbError::from)?;
            let tag = std::str::from_utf8(key)
                .map_err(|e| LmdbError::Corruption(format!("sketch tag: {}", e)))?;
            let sketch: HyperLogLog = bincode::deserialize(value).map_err(LmdbError::from)?;
            overlay.restore(tag, sketch)?;
            restored += 1;
        }
        drop(rtxn);

        tracing::info!(path = %path.display(), sketches = restored, "opened transaction store");

        Ok(Self {
            env,
            overlay: RwLock::new(overlay),
            cancel_check_interval: config.cancel_check_interval,
        })
    }

    pub fn environment(&self) -> &LmdbEnvironment {
        &self.env
    }

    /// Estimated number of distinct values indexed under `tag`.
    pub fn cardinality(&self, tag: &str) -> Result<u64, StoreError> {
        Ok(self.read_overlay()?.estimate(tag))
    }

    /// Number of stored transaction results.
    pub fn len(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.env.tx_results_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn read_overlay(&self) -> Result<RwLockReadGuard<'_, CardinalityOverlay>, StoreError> {
        self.overlay
            .read()
            .map_err(|_| StoreError::Backend("cardinality overlay lock poisoned".into()))
    }

    fn write_overlay(&self) -> Result<RwLockWriteGuard<'_, CardinalityOverlay>, StoreError> {
        self.overlay
            .write()
            .map_err(|_| StoreError::Backend("cardinality overlay lock poisoned".into()))
    }
}

impl TxStore for LmdbTxStore {
    fn get(&self, hash: &TxHash) -> Result<Option<TxResult>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self
            .env
            .tx_results_db
            .get(&rtxn, hash.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(
                bincode::deserialize(bytes).map_err(LmdbError::from)?,
            )),
            None => Ok(None),
        }
    }

    fn generic_search(
        &self,
        ctx: &SearchContext,
        conditions: &[Condition],
        skip: &SkipSet,
    ) -> Result<Vec<TxResult>, StoreError> {
        let plan = {
            let overlay = self.read_overlay()?;
            matcher::plan(conditions, skip, &overlay)
        };
        tracing::debug!(
            indexed = plan.indexed.len(),
            residual = plan.residual.len(),
            drive = plan.drive,
            "planned generic search"
        );

        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let mut check = ctx.checker(self.cancel_check_interval);
        match matcher::execute(&self.env, &rtxn, &plan, &mut check)? {
            Some(results) => Ok(results),
            None => {
                tracing::debug!(scanned = check.scanned(), "generic search cancelled");
                Ok(Vec::new())
            }
        }
    }
}

impl TxIndexer for LmdbTxStore {
    fn add_batch(&self, batch: &[TxResult]) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut wb = self.env.write_batch()?;
        for result in batch {
            wb.put_result(result)?;
        }

        // Hold the overlay across the commit so sketches and indexes move
        // together; it only changes once the batch is on disk.
        let mut overlay = self.write_overlay()?;
        let staged =
            overlay.stage(wb.observed().iter().map(|(t, v)| (t.as_str(), v.as_str())));
        let persisted = staged
            .iter()
            .try_for_each(|(tag, sketch)| wb.put_sketch(tag, sketch))
            .and_then(|()| wb.commit());
        if let Err(e) = persisted {
            tracing::warn!(error = %e, "failed to commit transaction batch");
            return Err(e.into());
        }
        let sketches = staged.len();
        overlay.apply(staged);

        tracing::debug!(results = batch.len(), sketches, "indexed batch");
        Ok(())
    }
}
