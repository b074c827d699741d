use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};

/// Client for the time-critical node queries.
///
/// Every call is a single attempt: a timeout, a connection error or a non-200
/// status is returned as an [`Error`] and never retried, so a stale node shows
/// up in the current cycle instead of being masked until the next one.
#[derive(Clone, Debug)]
pub struct NodeClient {
    client: Client,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

impl NodeClient {
    /// Creates a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client })
    }

    /// Issues a JSON-RPC 2.0 call and returns its `result` member.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, on any status other than 200, on
    /// an undecodable body or when the response carries an `error` member.
    pub async fn json_rpc(&self, url: &Url, method: &str, params: Value) -> Result<Value> {
        trace!("json-rpc {} -> {}", method, url);

        let body = self
            .post(
                url,
                &json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": method,
                    "params": params
                }),
            )
            .await?;

        let rpc_response: RpcResponse = serde_json::from_slice(&body)?;

        if let Some(error) = rpc_response.error {
            return Err(Error::JsonRpc(error.to_string()));
        }

        Ok(rpc_response.result)
    }

    /// Issues a GraphQL query and returns its `data` member.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, on any status other than 200, on
    /// an undecodable body, when the `errors` array is non-empty or when
    /// `data` is missing.
    pub async fn graphql(&self, url: &Url, query: &str, variables: Value) -> Result<Value> {
        trace!("graphql -> {}", url);

        let body = self
            .post(
                url,
                &json!({
                    "query": query,
                    "variables": variables
                }),
            )
            .await?;

        let response: GraphQlResponse = serde_json::from_slice(&body)?;

        if !response.errors.is_empty() {
            let messages = response
                .errors
                .into_iter()
                .map(|error| error.message)
                .collect::<Vec<_>>();

            return Err(Error::GraphQl(messages.join("; ")));
        }

        match response.data {
            Some(Value::Null) | None => Err(Error::Payload("missing data".to_string())),
            Some(data) => Ok(data),
        }
    }

    async fn post(&self, url: &Url, payload: &Value) -> Result<Vec<u8>> {
        let response = self.client.post(url.clone()).json(payload).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Status(status));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
