//! Error types for the oncall crate.

use thiserror::Error;

/// Result type for on-call operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the oncall crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Error from the transport.
    #[error(transparent)]
    Rpc(#[from] vigil_rpc::Error),
}
