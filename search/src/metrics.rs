//! Prometheus metrics for the search overlay.
//!
//! [`SearchMetrics`] owns its own [`Registry`] so a host process can encode
//! it next to whatever else it exports.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry,
};

/// Label values of `txindex_searches_total`.
pub const PATH_HASH: &str = "hash";
pub const PATH_HEIGHT: &str = "height";
pub const PATH_GENERIC: &str = "generic";
pub const PATH_CANCELLED: &str = "cancelled";

pub struct SearchMetrics {
    pub registry: Registry,

    /// Searches answered, labelled by the path that answered them.
    pub searches: IntCounterVec,
    /// Searches that ended in an error.
    pub errors: IntCounter,
    /// Wall time of a search, in milliseconds.
    pub latency_ms: Histogram,
}

impl SearchMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let searches = register_int_counter_vec_with_registry!(
            Opts::new("txindex_searches_total", "Searches answered, by path"),
            &["path"],
            registry
        )
        .expect("failed to register searches counter");

        let errors = register_int_counter_with_registry!(
            Opts::new("txindex_search_errors_total", "Searches that returned an error"),
            registry
        )
        .expect("failed to register search errors counter");

        // 0.05 ms up to roughly 1.6 s.
        let latency_ms = register_histogram_with_registry!(
            HistogramOpts::new("txindex_search_latency_ms", "Search latency in milliseconds")
                .buckets(prometheus::exponential_buckets(0.05, 2.0, 16).unwrap()),
            registry
        )
        .expect("failed to register search latency histogram");

        Self {
            registry,
            searches,
            errors,
            latency_ms,
        }
    }

    pub fn record(&self, path: &str) {
        self.searches.with_label_values(&[path]).inc();
    }

    pub fn count(&self, path: &str) -> u64 {
        self.searches.with_label_values(&[path]).get()
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_counted_separately() {
        let m = SearchMetrics::new();
        m.record(PATH_HASH);
        m.record(PATH_HASH);
        m.record(PATH_GENERIC);
        assert_eq!(m.count(PATH_HASH), 2);
        assert_eq!(m.count(PATH_GENERIC), 1);
        assert_eq!(m.count(PATH_HEIGHT), 0);
    }

    #[test]
    fn registry_gathers_all_families() {
        let m = SearchMetrics::new();
        m.record(PATH_CANCELLED);
        m.latency_ms.observe(1.0);
        let names: Vec<String> = m
            .registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"txindex_searches_total".to_string()));
        assert!(names.contains(&"txindex_search_latency_ms".to_string()));
    }
}
