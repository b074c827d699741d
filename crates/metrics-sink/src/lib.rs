//! Prometheus gauges written by the monitoring engine.
//!
//! Every gauge lives in a [`Metrics`] value with its own [`Registry`] instead of
//! the process-global default registry, so independent engines (and tests) do
//! not share state.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::{Error, Result};

use prometheus::{
    Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder, register_gauge_with_registry,
};

/// Labels of `node_state`.
pub const STATE_LABELS: [&str; 6] = [
    "authority",
    "backup",
    "qualified",
    "online",
    "bidding",
    "keyholder",
];

/// Labels of `node_bond`.
pub const BOND_LABELS: [&str; 3] = ["locked", "unlocked", "total"];

/// Labels of `node_reward`.
pub const REWARD_LABELS: [&str; 2] = ["total", "epoch"];

/// Labels of `network_reputation`.
pub const REPUTATION_LABELS: [&str; 5] = [
    "best",
    "worst",
    "average",
    "median",
    "worst_top10_threshold",
];

/// All gauges the engine publishes.
pub struct Metrics {
    registry: Registry,

    /// Latest block height reported by a monitored node
    pub node_block_height: GaugeVec,

    /// Latest block height reported by the chain's reference endpoint
    pub reference_block_height: GaugeVec,

    /// Whether a monitored node answered its health check (1/0)
    pub node_up: GaugeVec,

    /// Whether a monitored node is in sync with its reference (1/0)
    pub node_synced: GaugeVec,

    /// Software version of the validator, set to 1 when it matches the majority
    pub validator_version: GaugeVec,

    /// Validator state flags (1/0)
    pub node_state: GaugeVec,

    /// Tokens bonded by the validator
    pub node_bond: GaugeVec,

    /// Token rewards of the validator
    pub node_reward: GaugeVec,

    /// Minimum bid to become an authority in the next auction
    pub network_min_active_bid: Gauge,

    /// Reputation points of the validator
    pub node_reputation: Gauge,

    /// Reputation distribution of the active set
    pub network_reputation: GaugeVec,

    /// Penalties of the validator since the last cycle, by reason
    pub node_penalty: GaugeVec,

    /// Latest external block height witnessed by the validator, by chain
    pub node_observed_block_height: GaugeVec,
}

impl Metrics {
    /// Creates and registers every gauge in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a gauge cannot be registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let gauge_vec = |name: &str, help: &str, label: &str| -> Result<GaugeVec> {
            let gauge = GaugeVec::new(Opts::new(name, help), &[label])?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        let node_block_height = gauge_vec(
            "node_block_height",
            "The current block height of a given chain of the node",
            "chain",
        )?;
        let reference_block_height = gauge_vec(
            "reference_block_height",
            "The current block height of a given chain of the reference endpoint",
            "chain",
        )?;
        let node_up = gauge_vec("node_up", "Whether the node is up", "chain")?;
        let node_synced = gauge_vec("node_synced", "Whether the node is synced", "chain")?;
        let validator_version = gauge_vec(
            "validator_version",
            "Validator software version, 1 when matching the network majority",
            "version",
        )?;
        let node_state = gauge_vec("node_state", "The current state of the node", "state")?;
        let node_bond = gauge_vec(
            "node_bond",
            "The amount of tokens bonded in the node",
            "type",
        )?;
        let node_reward = gauge_vec(
            "node_reward",
            "The amount of token rewards of the node",
            "type",
        )?;
        let network_min_active_bid = register_gauge_with_registry!(
            "network_min_active_bid",
            "The minimum bid requirement for a node to become an authority with the next auction",
            registry
        )?;
        let node_reputation = register_gauge_with_registry!(
            "node_reputation",
            "The reputation points of the node",
            registry
        )?;
        let network_reputation = gauge_vec(
            "network_reputation",
            "The aggregated reputation points of the active nodes in the network",
            "type",
        )?;
        let node_penalty = gauge_vec(
            "node_penalty",
            "The penalties for misbehavior of the node since the last run",
            "reason",
        )?;
        let node_observed_block_height = gauge_vec(
            "node_observed_block_height",
            "The latest block height of a given chain observed & witnessed by the node",
            "chain",
        )?;

        Ok(Self {
            registry,
            node_block_height,
            reference_block_height,
            node_up,
            node_synced,
            validator_version,
            node_state,
            node_bond,
            node_reward,
            network_min_active_bid,
            node_reputation,
            network_reputation,
            node_penalty,
            node_observed_block_height,
        })
    }

    /// Encodes every gauge in the prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }

    /// Content type of [`Self::encode`] output.
    #[must_use]
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Records a node's own and its reference's block height.
    pub fn set_block_heights(&self, chain: &str, node: f64, reference: f64) {
        self.node_block_height.with_label_values(&[chain]).set(node);
        self.reference_block_height
            .with_label_values(&[chain])
            .set(reference);
    }

    /// Records the outcome of a health check.
    pub fn set_up(&self, chain: &str, up: bool) {
        self.node_up.with_label_values(&[chain]).set(flag(up));
    }

    /// Records the outcome of a sync check.
    pub fn set_synced(&self, chain: &str, synced: bool) {
        self.node_synced.with_label_values(&[chain]).set(flag(synced));
    }

    /// Publishes `version` as the only current validator version.
    pub fn set_version(&self, version: &str) {
        self.validator_version.reset();
        self.validator_version.with_label_values(&[version]).set(1.0);
    }

    /// Drops every published validator version.
    pub fn reset_version(&self) {
        self.validator_version.reset();
    }

    /// Records a single state flag.
    pub fn set_state(&self, state: &str, value: bool) {
        self.node_state.with_label_values(&[state]).set(flag(value));
    }

    /// Zeroes every state flag.
    pub fn reset_state(&self) {
        for state in STATE_LABELS {
            self.node_state.with_label_values(&[state]).set(0.0);
        }
    }

    /// Zeroes bond, rewards and the minimum active bid.
    pub fn reset_bond(&self) {
        for kind in BOND_LABELS {
            self.node_bond.with_label_values(&[kind]).set(0.0);
        }
        for kind in REWARD_LABELS {
            self.node_reward.with_label_values(&[kind]).set(0.0);
        }
        self.network_min_active_bid.set(0.0);
    }

    /// Zeroes the node's and the network's reputation.
    pub fn reset_reputation(&self) {
        self.node_reputation.set(0.0);
        for kind in REPUTATION_LABELS {
            self.network_reputation.with_label_values(&[kind]).set(0.0);
        }
    }

    /// Drops every per-reason penalty series.
    pub fn reset_penalties(&self) {
        self.node_penalty.reset();
    }

    /// Drops every observed external block height.
    pub fn reset_observations(&self) {
        self.node_observed_block_height.reset();
    }
}

const fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
