use thiserror::Error;

/// Result type for validator monitoring.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while collecting validator statistics.
#[derive(Debug, Error)]
pub enum Error {
    /// A response could not be decoded into the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The validator is known but not part of the active set.
    #[error("validator '{0}' is not in the active set")]
    NotActive(String),

    /// A response decoded but lacks a required value.
    #[error("unexpected payload: {0}")]
    Payload(String),

    /// Querying the validator's own node failed.
    #[error(transparent)]
    Probe(#[from] vigil_chain_probe::Error),

    /// A JSON-RPC or GraphQL call failed.
    #[error(transparent)]
    Rpc(#[from] vigil_rpc::Error),

    /// The indexer does not know the validator.
    #[error("validator '{0}' not found")]
    ValidatorNotFound(String),
}

impl Error {
    /// Whether the error reflects odd but plausible indexer data rather than
    /// a failing dependency.
    #[must_use]
    pub const fn is_data_integrity(&self) -> bool {
        matches!(self, Self::NotActive(_) | Self::ValidatorNotFound(_))
    }
}
