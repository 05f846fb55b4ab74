//! Error types for self-watch.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by self-watch.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// An address string could not be parsed.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        /// The offending input.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A chain RPC call failed.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The backend check endpoint failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// The poll task stopped without producing an outcome.
    #[error("poll task failed: {0}")]
    PollTask(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
