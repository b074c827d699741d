use thiserror::Error;

/// Result type for chain probes.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while querying a chain node.
#[derive(Debug, Error)]
pub enum Error {
    /// The node answered with a payload that is missing an expected field.
    #[error("unexpected payload: {0}")]
    Payload(String),

    /// The RPC call itself failed.
    #[error(transparent)]
    Rpc(#[from] vigil_rpc::Error),
}
