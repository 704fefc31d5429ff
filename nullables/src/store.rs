//! Nullable store: a thread-safe in-memory transaction store for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use txindex_query::{Condition, Tag};
use txindex_store::{SearchContext, SkipSet, StoreError, TxIndexer, TxStore};
use txindex_types::{TxHash, TxResult};

/// Arguments of one `generic_search` call, as seen by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedSearch {
    pub conditions: Vec<Condition>,
    pub skip: SkipSet,
}

#[derive(Default)]
struct Inner {
    results: HashMap<TxHash, TxResult>,
    by_position: BTreeMap<(u64, u32), TxHash>,
}

/// An in-memory base store that matches by brute force.
/// Thread-safe for use from concurrent searches.
pub struct NullTxStore {
    inner: Mutex<Inner>,
    gets: Mutex<Vec<TxHash>>,
    searches: Mutex<Vec<RecordedSearch>>,
    fail_get: Mutex<Option<String>>,
    fail_search: Mutex<Option<String>>,
}

impl NullTxStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            gets: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
            fail_get: Mutex::new(None),
            fail_search: Mutex::new(None),
        }
    }

    /// Build a store pre-populated with `results`.
    pub fn with_results(results: impl IntoIterator<Item = TxResult>) -> Self {
        let store = Self::new();
        for res in results {
            store.insert(res);
        }
        store
    }

    fn insert(&self, result: TxResult) {
        let hash = txindex_crypto::tx_result_hash(&result);
        let mut inner = self.inner.lock().unwrap();
        if let Some(old) = inner.results.insert(hash, result.clone()) {
            inner.by_position.remove(&old.position());
        }
        if let Some(displaced) = inner.by_position.insert(result.position(), hash) {
            if displaced != hash {
                inner.results.remove(&displaced);
            }
        }
    }

    /// Make every subsequent `get` fail with a backend error.
    pub fn fail_get_with(&self, message: &str) {
        *self.fail_get.lock().unwrap() = Some(message.to_string());
    }

    /// Make every subsequent `generic_search` fail with a backend error.
    pub fn fail_search_with(&self, message: &str) {
        *self.fail_search.lock().unwrap() = Some(message.to_string());
    }

    /// Hashes passed to `get`, in call order.
    pub fn get_calls(&self) -> Vec<TxHash> {
        self.gets.lock().unwrap().clone()
    }

    /// Every `generic_search` call, in call order.
    pub fn search_calls(&self) -> Vec<RecordedSearch> {
        self.searches.lock().unwrap().clone()
    }

    pub fn last_search(&self) -> Option<RecordedSearch> {
        self.searches.lock().unwrap().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NullTxStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `result` passes every condition, honouring the skip set.
fn matches_all(
    hash: &TxHash,
    result: &TxResult,
    conditions: &[Condition],
    skip: &SkipSet,
) -> bool {
    conditions.iter().all(|cond| {
        if !skip.is_skipped(cond) {
            return cond.matches_tx(hash, result);
        }
        // Skipped height equality is a key restriction, still binding.
        match (cond.tag(), cond.height_eq()) {
            (Tag::Height, Some(h)) => result.height == h,
            _ => true,
        }
    })
}

impl TxStore for NullTxStore {
    fn get(&self, hash: &TxHash) -> Result<Option<TxResult>, StoreError> {
        self.gets.lock().unwrap().push(*hash);
        if let Some(msg) = self.fail_get.lock().unwrap().clone() {
            return Err(StoreError::Backend(msg));
        }
        Ok(self.inner.lock().unwrap().results.get(hash).cloned())
    }

    fn generic_search(
        &self,
        ctx: &SearchContext,
        conditions: &[Condition],
        skip: &SkipSet,
    ) -> Result<Vec<TxResult>, StoreError> {
        self.searches.lock().unwrap().push(RecordedSearch {
            conditions: conditions.to_vec(),
            skip: skip.clone(),
        });
        if let Some(msg) = self.fail_search.lock().unwrap().clone() {
            return Err(StoreError::Backend(msg));
        }

        let inner = self.inner.lock().unwrap();
        let mut check = ctx.checker(1);
        let mut out = Vec::new();
        for hash in inner.by_position.values() {
            if check.tick() {
                return Ok(Vec::new());
            }
            let result = &inner.results[hash];
            if matches_all(hash, result, conditions, skip) {
                out.push(result.clone());
            }
        }
        Ok(out)
    }
}

impl TxIndexer for NullTxStore {
    fn add_batch(&self, batch: &[TxResult]) -> Result<(), StoreError> {
        for res in batch {
            self.insert(res.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txindex_query::Query;
    use txindex_types::{Event, EventAttribute, ExecTxResult};

    fn tx(height: u64, index: u32, amount: &str) -> TxResult {
        TxResult {
            height,
            index,
            tx: format!("tx-{}-{}", height, index).into_bytes(),
            result: ExecTxResult {
                events: vec![Event::new(
                    "transfer",
                    vec![EventAttribute::indexed("amount", amount)],
                )],
                ..Default::default()
            },
        }
    }

    #[test]
    fn get_returns_stored_result() {
        let res = tx(1, 0, "10");
        let store = NullTxStore::with_results([res.clone()]);
        let hash = txindex_crypto::tx_result_hash(&res);
        assert_eq!(store.get(&hash).unwrap(), Some(res));
        assert_eq!(store.get(&TxHash::ZERO).unwrap(), None);
        assert_eq!(store.get_calls(), vec![hash, TxHash::ZERO]);
    }

    #[test]
    fn generic_search_orders_by_position() {
        let store = NullTxStore::with_results([tx(2, 0, "1"), tx(1, 1, "1"), tx(1, 0, "1")]);
        let found = store
            .generic_search(&SearchContext::new(), &[], &SkipSet::new())
            .unwrap();
        let positions: Vec<_> = found.iter().map(TxResult::position).collect();
        assert_eq!(positions, vec![(1, 0), (1, 1), (2, 0)]);
    }

    #[test]
    fn skipped_height_still_restricts() {
        let store = NullTxStore::with_results([tx(5, 0, "50"), tx(5, 1, "500"), tx(6, 0, "500")]);
        let q = Query::parse("tx.height = 5 AND transfer.amount > 100").unwrap();
        let skip: SkipSet = [q.conditions()[0].id()].into_iter().collect();
        let found = store
            .generic_search(&SearchContext::new(), q.conditions(), &skip)
            .unwrap();
        assert_eq!(found, vec![tx(5, 1, "500")]);
        assert_eq!(store.last_search().unwrap().skip, skip);
    }

    #[test]
    fn cancelled_scan_returns_empty() {
        let store = NullTxStore::with_results([tx(1, 0, "1")]);
        let ctx = SearchContext::new();
        ctx.cancel();
        let found = store.generic_search(&ctx, &[], &SkipSet::new()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn injected_failures_surface() {
        let store = NullTxStore::new();
        store.fail_get_with("disk on fire");
        store.fail_search_with("disk on fire");
        assert!(matches!(store.get(&TxHash::ZERO), Err(StoreError::Backend(_))));
        assert!(store
            .generic_search(&SearchContext::new(), &[], &SkipSet::new())
            .is_err());
    }

    #[test]
    fn reindex_replaces_position() {
        let store = NullTxStore::new();
        let mut res = tx(1, 0, "1");
        store.index(&res).unwrap();
        res.height = 9;
        store.index(&res).unwrap();
        assert_eq!(store.len(), 1);
        let found = store
            .generic_search(&SearchContext::new(), &[], &SkipSet::new())
            .unwrap();
        assert_eq!(found[0].height, 9);
    }

    #[test]
    fn occupied_position_is_replaced() {
        let store = NullTxStore::new();
        let first = tx(1, 0, "1");
        let mut second = tx(1, 0, "2");
        second.tx = b"other".to_vec();
        store.add_batch(&[first.clone(), second.clone()]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&txindex_crypto::tx_result_hash(&first)).unwrap(), None);
        assert_eq!(store.get(&txindex_crypto::tx_result_hash(&second)).unwrap(), Some(second));
    }
}
