//! LMDB storage backend for the transaction index.
//!
//! Implements the `txindex-store` traits using the `heed` LMDB bindings.
//! All databases live in a single environment:
//!
//! | database       | key                                              | value            |
//! |----------------|--------------------------------------------------|------------------|
//! | `tx_results`   | `tx_hash(32)`                                    | bincode TxResult |
//! | `height_index` | `height_be(8) ++ index_be(4)`                    | `tx_hash(32)`    |
//! | `event_index`  | `tag ++ 0x00 ++ value ++ 0x00 ++ height_be(8) ++ index_be(4)` | `tx_hash(32)` |
//! | `sketches`     | `tag`                                            | bincode HyperLogLog |
//! | `meta`         | utf-8 name                                       | raw bytes        |
//!
//! Big-endian integers sort numerically, so every index can be range-scanned
//! in `(height, index)` order.

pub mod config;
pub mod environment;
pub mod error;
pub mod keys;
mod matcher;
pub mod store;
pub mod write_batch;

pub use config::StoreConfig;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use store::LmdbTxStore;
pub use write_batch::WriteBatch;
