use serde_json::{Value, json};
use url::Url;
use vigil_rpc::NodeClient;

use crate::error::{Error, Result};

/// RPC dialect spoken by a chain's nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainFamily {
    /// Substrate-based chains (Polkadot, the Chainflip State Chain).
    Substrate,
    /// Solana validators and RPC nodes.
    Solana,
    /// Ethereum execution clients and EVM rollups.
    Evm,
    /// Bitcoin Core.
    Bitcoin,
    /// Tendermint / CometBFT based chains.
    Tendermint,
}

/// Sync progress as reported by a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncState {
    /// The node says it is still catching up.
    pub syncing: bool,

    /// Height of the node's best block.
    pub height: u64,
}

impl ChainFamily {
    /// Runs the family's health call.
    ///
    /// Returns `Ok(false)` only when the node answered with an explicit
    /// "not healthy" payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn health(self, client: &NodeClient, url: &Url) -> Result<bool> {
        let result = client
            .json_rpc(url, self.health_method(), self.params())
            .await?;

        Ok(match self {
            Self::Solana => result.as_str() == Some("ok"),
            _ => true,
        })
    }

    /// Reads the node's own sync state.
    ///
    /// # Errors
    ///
    /// Returns an error if a call fails or its payload lacks the height.
    pub async fn sync_state(self, client: &NodeClient, url: &Url) -> Result<SyncState> {
        match self {
            Self::Substrate => {
                let result = client
                    .json_rpc(url, "system_syncState", self.params())
                    .await?;
                let current = height_at(&result, "/currentBlock")?;
                let highest = height_at(&result, "/highestBlock")?;

                Ok(SyncState {
                    syncing: current < highest,
                    height: current,
                })
            }
            Self::Solana => {
                let result = client.json_rpc(url, "getSlot", self.params()).await?;

                Ok(SyncState {
                    syncing: false,
                    height: height_at(&result, "")?,
                })
            }
            Self::Evm => {
                let (syncing, number) = tokio::join!(
                    client.json_rpc(url, "eth_syncing", self.params()),
                    client.json_rpc(url, "eth_blockNumber", self.params())
                );

                Ok(SyncState {
                    syncing: syncing? != Value::Bool(false),
                    height: hex_height(&number?)?,
                })
            }
            Self::Bitcoin => {
                let result = client
                    .json_rpc(url, "getblockchaininfo", self.params())
                    .await?;
                let blocks = height_at(&result, "/blocks")?;
                let headers = height_at(&result, "/headers")?;
                let initial_download = result
                    .get("initialblockdownload")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

                Ok(SyncState {
                    syncing: initial_download || blocks < headers,
                    height: blocks,
                })
            }
            Self::Tendermint => {
                let result = client.json_rpc(url, "status", self.params()).await?;
                let catching_up = result
                    .pointer("/sync_info/catching_up")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| {
                        Error::Payload(format!("missing sync_info.catching_up in {result}"))
                    })?;

                Ok(SyncState {
                    syncing: catching_up,
                    height: height_at(&result, "/sync_info/latest_block_height")?,
                })
            }
        }
    }

    /// Reads the chain height from an independent reference endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or its payload lacks the height.
    pub async fn reference_height(self, client: &NodeClient, url: &Url) -> Result<u64> {
        match self {
            Self::Bitcoin => {
                let result = client.json_rpc(url, "getblockcount", self.params()).await?;
                height_at(&result, "")
            }
            Self::Evm => {
                let result = client
                    .json_rpc(url, "eth_blockNumber", self.params())
                    .await?;
                hex_height(&result)
            }
            _ => Ok(self.sync_state(client, url).await?.height),
        }
    }

    const fn health_method(self) -> &'static str {
        match self {
            Self::Substrate => "system_health",
            Self::Solana => "getHealth",
            Self::Evm => "eth_syncing",
            Self::Bitcoin => "getblockchaininfo",
            Self::Tendermint => "health",
        }
    }

    fn params(self) -> Value {
        match self {
            Self::Tendermint => json!({}),
            _ => json!([]),
        }
    }
}

/// Reads a block height that may be encoded as a number or a decimal string.
fn height_at(value: &Value, pointer: &str) -> Result<u64> {
    let field = value.pointer(pointer);

    field
        .and_then(|field| match field {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        })
        .ok_or_else(|| Error::Payload(format!("expected a block height at '{pointer}' in {value}")))
}

fn hex_height(value: &Value) -> Result<u64> {
    value
        .as_str()
        .and_then(|text| text.strip_prefix("0x"))
        .and_then(|digits| u64::from_str_radix(digits, 16).ok())
        .ok_or_else(|| Error::Payload(format!("expected a hex block number, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_accepts_numbers_and_strings() {
        let result = json!({ "currentBlock": 1200, "sync_info": { "latest_block_height": "19876" } });

        assert_eq!(height_at(&result, "/currentBlock").unwrap(), 1200);
        assert_eq!(height_at(&result, "/sync_info/latest_block_height").unwrap(), 19876);
        assert_eq!(height_at(&json!(42), "").unwrap(), 42);
    }

    #[test]
    fn test_height_rejects_missing_field() {
        let result = json!({ "highestBlock": 1 });

        assert!(matches!(
            height_at(&result, "/currentBlock"),
            Err(Error::Payload(_))
        ));
    }

    #[test]
    fn test_hex_height() {
        assert_eq!(hex_height(&json!("0x10")).unwrap(), 16);
        assert_eq!(hex_height(&json!("0x1312d00")).unwrap(), 20_000_000);
        assert!(hex_height(&json!("1312d00")).is_err());
        assert!(hex_height(&json!(16)).is_err());
    }
}
