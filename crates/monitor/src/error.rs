use thiserror::Error;

/// Result type for the monitor.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop the monitor from starting or from finishing a command.
#[derive(Debug, Error)]
pub enum Error {
    /// The on-call integration failed.
    #[error("alerting error: {0}")]
    Alerting(#[from] vigil_oncall::Error),

    /// The metrics server could not bind or serve.
    #[error("metrics server error: {0}")]
    Io(#[from] std::io::Error),

    /// The metrics registry could not be built.
    #[error("metrics error: {0}")]
    Metrics(#[from] vigil_metrics::Error),

    /// The node client could not be built.
    #[error("rpc error: {0}")]
    Rpc(#[from] vigil_rpc::Error),
}
