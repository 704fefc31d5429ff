//! Transaction search overlay.
//!
//! [`TxSearch`] answers conjunctive [`Query`](txindex_query::Query)s against
//! any [`TxStore`](txindex_store::TxStore). Two query shapes are handled
//! before the base store's generic matcher is involved:
//!
//! - `tx.hash = '<hex>'` is answered with a single key lookup.
//! - Repeated `tx.height = N` conditions collapse to the last one, which is
//!   then handed to the base store as a key restriction via the skip set.
//!
//! Everything else is delegated unchanged.

pub mod error;
pub mod fast_path;
pub mod metrics;
pub mod search;

pub use error::SearchError;
pub use fast_path::{dedup_height, look_for_hash, HeightInfo, HeightPlan};
pub use metrics::SearchMetrics;
pub use search::TxSearch;
