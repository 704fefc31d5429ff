//! Fundamental types for the transaction index.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! transaction hashes and the committed transaction results that the store
//! persists and the search layer hands back to callers.

pub mod error;
pub mod hash;
pub mod tx;

pub use error::TypesError;
pub use hash::TxHash;
pub use tx::{Event, EventAttribute, ExecTxResult, TxResult};
