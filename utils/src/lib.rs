//! Shared utilities for the transaction index.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};
