//! Hashing primitives for the transaction index.
//!
//! - SHA-256 identifies transactions (the hash clients query `tx.hash` with).
//! - Blake2b feeds the cardinality sketches, which only need a well-mixed
//!   64-bit value per item.

pub mod hash;

pub use hash::{blake2b_64, hash_transaction, sha256, tx_result_hash};
