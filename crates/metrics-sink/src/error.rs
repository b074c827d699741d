//! Error types for the metrics crate.

use thiserror::Error;

/// Result type for metrics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the metrics crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Encoded output was not valid UTF-8.
    #[error("encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Registering or encoding a metric failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}
