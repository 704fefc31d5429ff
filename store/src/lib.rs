//! Abstract base-store contract for the transaction index.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The search layer depends only on the traits.

pub mod cardinality;
pub mod context;
pub mod error;
pub mod skip;
pub mod tx;

pub use cardinality::{CardinalityOverlay, CardinalitySketch, HyperLogLog};
pub use context::SearchContext;
pub use error::StoreError;
pub use skip::SkipSet;
pub use tx::{TxIndexer, TxStore};
