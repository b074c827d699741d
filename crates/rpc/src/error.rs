//! Error types for the rpc crate.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the rpc crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The GraphQL response carried a non-empty `errors` array.
    #[error("graphql errors: {0}")]
    GraphQl(String),

    /// The request failed before a response was received.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON-RPC response carried an `error` member.
    #[error("json-rpc error: {0}")]
    JsonRpc(String),

    /// The response decoded but lacked an expected field.
    #[error("payload error: {0}")]
    Payload(String),

    /// The server answered with an unexpected status code.
    #[error("HTTP status code: {0}")]
    Status(StatusCode),
}
