//! Nullable infrastructure for deterministic testing.
//!
//! The base store is abstracted behind the `txindex-store` traits. This
//! crate provides an in-memory implementation that:
//! - Never touches the filesystem
//! - Records every call so tests can assert on what the search layer asked for
//! - Can be told to fail, to exercise error paths
//!
//! Usage: swap the LMDB store for [`NullTxStore`] in tests.

pub mod store;

pub use store::{NullTxStore, RecordedSearch};
