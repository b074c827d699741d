//! HTTP transport shared by the node probes and the on-call integration.
//!
//! Two clients live here with deliberately different failure policies:
//! [`NodeClient`] makes exactly one attempt per call and hands every failure
//! back to the caller, while [`RetryingClient`] keeps retrying a request until
//! the server answers with the status code expected for that verb.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod node;
mod retry;

pub use error::{Error, Result};
pub use node::NodeClient;
pub use retry::{DEFAULT_BACKOFF, RetryingClient, expected_status};

/// Re-exported so downstream crates don't need a direct reqwest dependency.
pub use reqwest::{Method, StatusCode};
