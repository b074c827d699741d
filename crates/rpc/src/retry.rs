use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::Result;

/// Pause between two attempts of the same request.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// Returns the status code that marks a request as successful.
///
/// The resolve action is a POST that answers 200, any other POST creates a
/// resource (201), DELETE answers 204 and everything else 200.
#[must_use]
pub fn expected_status(method: &Method, url: &str) -> StatusCode {
    let path = url.split('?').next().unwrap_or(url).trim_end_matches('/');

    if *method == Method::POST && path.ends_with("/resolve") {
        StatusCode::OK
    } else if *method == Method::POST {
        StatusCode::CREATED
    } else if *method == Method::DELETE {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::OK
    }
}

/// Bearer-authenticated client that retries until the expected status.
///
/// Writes to the on-call service must not be lost to a transient blip, so a
/// request is repeated (after [`DEFAULT_BACKOFF`]) until it succeeds. Each
/// attempt is bounded by the client timeout; only the number of attempts is
/// unbounded.
#[derive(Clone, Debug)]
pub struct RetryingClient {
    backoff: Duration,
    bearer_token: String,
    client: Client,
}

impl RetryingClient {
    /// Creates a client that authenticates with `bearer_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(bearer_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            backoff: DEFAULT_BACKOFF,
            bearer_token: bearer_token.into(),
            client,
        })
    }

    /// Overrides the pause between attempts.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sends a request, retrying until the expected status is returned.
    ///
    /// An empty body (e.g. `204 No Content`) decodes to [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Only returns an error when a successful response has a body that is not
    /// valid JSON; transport and status failures are retried.
    pub async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        let expected = expected_status(&method, url);

        loop {
            match self.attempt(method.clone(), url, body).await {
                Ok((status, bytes)) if status == expected => {
                    debug!("{} {}: {}", method, url, status);

                    if bytes.is_empty() {
                        return Ok(Value::Null);
                    }
                    return Ok(serde_json::from_slice(&bytes)?);
                }
                Ok((status, _)) => {
                    error!("{} {}: HTTP status code: {}", method, url, status);
                }
                Err(e) => {
                    error!("{} {}: {}", method, url, e);
                }
            }

            tokio::time::sleep(self.backoff).await;
        }
    }

    /// Issues one unauthenticated GET and returns the status code.
    ///
    /// Used for heartbeat pings, whose URLs carry their own token.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    pub async fn get_once(&self, url: &str) -> Result<StatusCode> {
        let response = self.client.get(url).send().await?;

        Ok(response.status())
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Vec<u8>)> {
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.bearer_token);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?.to_vec();

        Ok((status, bytes))
    }
}
