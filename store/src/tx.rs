//! Transaction result storage traits.

use txindex_query::Condition;
use txindex_types::{TxHash, TxResult};

use crate::{SearchContext, SkipSet, StoreError};

/// Read side of the base store.
///
/// Implementations must be safe for any number of concurrent readers while
/// a writer appends new results.
pub trait TxStore: Send + Sync {
    /// Exact lookup by transaction hash. `Ok(None)` when nothing is stored.
    fn get(&self, hash: &TxHash) -> Result<Option<TxResult>, StoreError>;

    /// Conjunctive match over the secondary indexes.
    ///
    /// Every condition not in `skip` must hold for a returned result.
    /// Height-equality conditions in `skip` restrict the scan to that height
    /// directly. An empty `conditions` slice matches everything. Results are
    /// ordered by `(height, index)` and contain no duplicates. If `ctx` is
    /// cancelled part-way through, the scan stops and returns an empty list.
    fn generic_search(
        &self,
        ctx: &SearchContext,
        conditions: &[Condition],
        skip: &SkipSet,
    ) -> Result<Vec<TxResult>, StoreError>;
}

/// Write side of the base store, driven at block-commit time.
pub trait TxIndexer: TxStore {
    /// Index a single result. Re-indexing a hash replaces the earlier entry.
    fn index(&self, result: &TxResult) -> Result<(), StoreError> {
        self.add_batch(std::slice::from_ref(result))
    }

    /// Index a batch of results atomically.
    fn add_batch(&self, batch: &[TxResult]) -> Result<(), StoreError>;
}
