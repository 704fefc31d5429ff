//! Error type for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid transaction hash: {0}")]
    InvalidHash(String),
}
