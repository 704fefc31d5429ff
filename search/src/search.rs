//! The search entry point.

use std::sync::Arc;
use std::time::Instant;

use txindex_query::Query;
use txindex_store::{SearchContext, TxStore};
use txindex_types::TxResult;

use crate::fast_path::{dedup_height, look_for_hash};
use crate::metrics::{self, SearchMetrics};
use crate::SearchError;

/// Search overlay over a shared base store.
///
/// Holds no state of its own beyond the store handle and optional metrics,
/// so any number of searches may run through one instance concurrently.
pub struct TxSearch<S: TxStore + ?Sized> {
    store: Arc<S>,
    metrics: Option<Arc<SearchMetrics>>,
}

impl<S: TxStore + ?Sized> Clone for TxSearch<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S: TxStore + ?Sized> TxSearch<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Find every stored result satisfying all conditions of `query`.
    ///
    /// A context that is already cancelled yields an empty list, not an
    /// error. A well-formed `tx.hash` equality is answered by key lookup
    /// alone and returns at most one result. Otherwise repeated height
    /// equalities are collapsed and the rest is delegated to the base store,
    /// whose ordering is returned as is.
    pub fn search(
        &self,
        ctx: &SearchContext,
        query: &Query,
    ) -> Result<Vec<TxResult>, SearchError> {
        let started = Instant::now();
        let outcome = self.dispatch(ctx, query);
        if let Some(m) = &self.metrics {
            m.latency_ms
                .observe(started.elapsed().as_secs_f64() * 1_000.0);
            match &outcome {
                Ok((path, _)) => m.record(path),
                Err(_) => m.errors.inc(),
            }
        }
        outcome.map(|(_, results)| results)
    }

    fn dispatch(
        &self,
        ctx: &SearchContext,
        query: &Query,
    ) -> Result<(&'static str, Vec<TxResult>), SearchError> {
        if ctx.is_cancelled() {
            tracing::debug!(%query, "search cancelled before start");
            return Ok((metrics::PATH_CANCELLED, Vec::new()));
        }

        if let Some(hash) = look_for_hash(query.conditions())? {
            tracing::debug!(%hash, "answering search by hash lookup");
            let found = self.store.get(&hash).map_err(|e| {
                tracing::warn!(%hash, error = %e, "hash lookup failed");
                SearchError::LookupFailed(e)
            })?;
            return Ok((metrics::PATH_HASH, found.into_iter().collect()));
        }

        let plan = dedup_height(query.conditions());
        let path = if plan.info.height_eq.is_some() {
            metrics::PATH_HEIGHT
        } else {
            metrics::PATH_GENERIC
        };
        tracing::debug!(
            conditions = plan.conditions.len(),
            dropped = query.len() - plan.conditions.len(),
            only_height_eq = plan.info.only_height_eq,
            skipped = plan.skip.len(),
            "delegating search to base store"
        );

        let results = self
            .store
            .generic_search(ctx, &plan.conditions, &plan.skip)
            .map_err(|e| {
                tracing::warn!(%query, error = %e, "generic search failed");
                SearchError::SearchFailed(e)
            })?;
        Ok((path, results))
    }
}
