use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use url::Url;
use vigil_metrics::Metrics;
use vigil_oncall::{AlertController, HeartbeatType};
use vigil_rpc::NodeClient;

use crate::error::Result;
use crate::family::{ChainFamily, SyncState};
use crate::probe::{ChainProbe, is_behind};

const HEARTBEATS: &[HeartbeatType] = &[HeartbeatType::Health, HeartbeatType::SyncStatus];

/// Options for creating an [`RpcNode`].
#[derive(Clone, Debug)]
pub struct RpcNodeOptions {
    /// Name used for metric labels and alert titles.
    pub name: String,

    /// RPC dialect of the node.
    pub family: ChainFamily,

    /// Endpoint of the monitored node.
    pub url: Url,

    /// Independent endpoint of the same chain to compare heights against.
    pub reference_url: Option<Url>,

    /// Blocks the node may trail the reference and still count as synced.
    pub tolerance: u64,
}

/// A chain node probed over JSON-RPC.
pub struct RpcNode {
    name: String,
    family: ChainFamily,
    url: Url,
    reference_url: Option<Url>,
    tolerance: u64,
    client: NodeClient,
    metrics: Arc<Metrics>,
    alerts: Arc<AlertController>,
}

impl RpcNode {
    /// Creates a probe for the node described by `options`.
    #[must_use]
    pub fn new(
        options: RpcNodeOptions,
        client: NodeClient,
        metrics: Arc<Metrics>,
        alerts: Arc<AlertController>,
    ) -> Self {
        Self {
            name: options.name,
            family: options.family,
            url: options.url,
            reference_url: options.reference_url,
            tolerance: options.tolerance,
            client,
            metrics,
            alerts,
        }
    }

    /// Endpoint of the monitored node.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Client used for every call to the node.
    #[must_use]
    pub const fn client(&self) -> &NodeClient {
        &self.client
    }

    /// Reads the node's sync state without recording anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be queried.
    pub async fn sync_state(&self) -> Result<SyncState> {
        self.family.sync_state(&self.client, &self.url).await
    }

    /// Runs the health call and logs its outcome without recording anything.
    pub async fn check_health(&self) -> bool {
        debug!("{}: checking if the node is up", self.name);

        match self.family.health(&self.client, &self.url).await {
            Ok(true) => true,
            Ok(false) => {
                error!("{}: node reports it is not healthy", self.name);
                false
            }
            Err(e) => {
                error!("{}: health check failed: {}", self.name, e);
                false
            }
        }
    }

    /// Publishes a health verdict and sends the Health heartbeat when up.
    pub async fn record_up(&self, up: bool) {
        self.metrics.set_up(&self.name, up);

        if up {
            info!("{}: node is up", self.name);
            self.alerts
                .send_heartbeat(&self.name, HeartbeatType::Health)
                .await;
        }
    }

    async fn reference_height(&self) -> Option<u64> {
        let url = self.reference_url.as_ref()?;

        match self.family.reference_height(&self.client, url).await {
            Ok(height) => Some(height),
            Err(e) => {
                error!("{}: reference height unavailable: {}", self.name, e);
                None
            }
        }
    }

    async fn evaluate_sync(&self) -> bool {
        debug!("{}: checking if the node is synced", self.name);

        // Sampled together so both heights describe the same moment.
        let (node, reference) = tokio::join!(self.sync_state(), self.reference_height());

        let node = match node {
            Ok(node) => node,
            Err(e) => {
                error!("{}: sync state unavailable: {}", self.name, e);
                self.metrics
                    .set_block_heights(&self.name, 0.0, gauge(reference));
                return false;
            }
        };

        self.metrics
            .set_block_heights(&self.name, gauge(Some(node.height)), gauge(reference));

        if node.syncing {
            warn!("{}: node is still syncing", self.name);
            return false;
        }

        info!(
            "{}: node block height = {}, reference block height = {:?}",
            self.name, node.height, reference
        );

        if is_behind(node.height, reference, self.tolerance) {
            warn!(
                "{}: node is behind: {} < {:?} - {}",
                self.name, node.height, reference, self.tolerance
            );
            return false;
        }

        true
    }
}

#[async_trait]
impl ChainProbe for RpcNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn heartbeats(&self) -> &'static [HeartbeatType] {
        HEARTBEATS
    }

    async fn is_up(&self) -> bool {
        let up = self.check_health().await;
        self.record_up(up).await;

        up
    }

    async fn is_synced(&self) -> bool {
        let synced = self.evaluate_sync().await;
        self.metrics.set_synced(&self.name, synced);

        if synced {
            info!("{}: node is synced", self.name);
            self.alerts
                .send_heartbeat(&self.name, HeartbeatType::SyncStatus)
                .await;
        }

        synced
    }
}

#[allow(clippy::cast_precision_loss)]
fn gauge(height: Option<u64>) -> f64 {
    height.map_or(0.0, |height| height as f64)
}
