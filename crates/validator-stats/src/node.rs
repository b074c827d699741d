use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, error};
use url::Url;
use vigil_chain_probe::{ChainFamily, ChainProbe, RpcNode, RpcNodeOptions};
use vigil_metrics::Metrics;
use vigil_oncall::{AlertController, HeartbeatType};
use vigil_rpc::NodeClient;

/// Name of the validator's chain in metric labels and alert titles.
pub const VALIDATOR_CHAIN: &str = "Chainflip";

const HEARTBEATS: &[HeartbeatType] = &[
    HeartbeatType::Health,
    HeartbeatType::SyncStatus,
    HeartbeatType::Version,
];

/// Options for creating a [`ValidatorNode`].
#[derive(Clone, Debug)]
pub struct ValidatorNodeOptions {
    /// SS58 address of the validator account.
    pub address: String,

    /// Endpoint of the validator's State Chain node.
    pub url: Url,

    /// Independent State Chain endpoint to compare heights against.
    pub reference_url: Option<Url>,
}

/// The validator's own State Chain node.
///
/// Probed like any Substrate node, except that being up also requires the
/// chain to consider the validator account online.
pub struct ValidatorNode {
    address: String,
    rpc: RpcNode,
}

impl ValidatorNode {
    /// Creates the probe.
    #[must_use]
    pub fn new(
        options: ValidatorNodeOptions,
        client: NodeClient,
        metrics: Arc<Metrics>,
        alerts: Arc<AlertController>,
    ) -> Self {
        let rpc = RpcNode::new(
            RpcNodeOptions {
                name: VALIDATOR_CHAIN.to_string(),
                family: ChainFamily::Substrate,
                url: options.url,
                reference_url: options.reference_url,
                tolerance: 1,
            },
            client,
            metrics,
            alerts,
        );

        Self {
            address: options.address,
            rpc,
        }
    }

    /// SS58 address of the validator account.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The underlying Substrate probe.
    #[must_use]
    pub const fn rpc(&self) -> &RpcNode {
        &self.rpc
    }

    async fn is_online(&self) -> bool {
        debug!("{}: checking if the validator is online", VALIDATOR_CHAIN);

        let account = self
            .rpc
            .client()
            .json_rpc(
                self.rpc.url(),
                "cf_account_info_v2",
                json!({ "account_id": self.address }),
            )
            .await;

        match account {
            Ok(info) => match info.get("is_online").and_then(Value::as_bool) {
                Some(true) => true,
                Some(false) => {
                    error!("{}: validator is not online", VALIDATOR_CHAIN);
                    false
                }
                None => {
                    error!("{}: account info lacks 'is_online': {}", VALIDATOR_CHAIN, info);
                    false
                }
            },
            Err(e) => {
                error!("{}: account info unavailable: {}", VALIDATOR_CHAIN, e);
                false
            }
        }
    }
}

#[async_trait]
impl ChainProbe for ValidatorNode {
    fn name(&self) -> &str {
        VALIDATOR_CHAIN
    }

    fn heartbeats(&self) -> &'static [HeartbeatType] {
        HEARTBEATS
    }

    async fn is_up(&self) -> bool {
        let (online, healthy) = tokio::join!(self.is_online(), self.rpc.check_health());

        let up = online && healthy;
        self.rpc.record_up(up).await;

        up
    }

    async fn is_synced(&self) -> bool {
        self.rpc.is_synced().await
    }
}
