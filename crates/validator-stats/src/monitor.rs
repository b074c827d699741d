use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};
use url::Url;
use vigil_metrics::Metrics;
use vigil_oncall::{AlertController, HeartbeatType, IncidentCategory};

use crate::amount::format_thousands;
use crate::error::{Error, Result};
use crate::node::{VALIDATOR_CHAIN, ValidatorNode};
use crate::queries::{
    ACTIVE_AUTHORITY_INFO, Account, AccountInfo, AuctionInfo, AuthorityInfo, CacheValidators,
    Connection, EXTRINSICS_BY_ACCOUNT, Epoch, Extrinsic, LATEST_AUCTION, PENALTIES, Penalty,
    VALIDATOR_ACCOUNT, VALIDATOR_BY_ID, VALIDATORS, ValidatorRecord, chain_tracking,
};
use crate::stats::{
    OBSERVATION_WINDOW_BLOCKS, PenaltyWindow, ReputationDistribution, latest_observations,
    majority_version, penalties_by_reason,
};

/// Processor indexer of the Perseverance network.
pub const DEFAULT_PROCESSOR_URL: &str = "https://processor-perseverance.chainflip.io/graphql";

/// Cache indexer of the Perseverance network.
pub const DEFAULT_CACHE_URL: &str = "https://chainflip-cache-perseverance.chainflip.io/graphql";

/// Reputation below which a Reputation incident opens.
pub const DEFAULT_REPUTATION_FLOOR: i64 = 2000;

/// Records requested per page of a cursor-paginated query.
const PAGE_SIZE: u64 = 1000;

/// Options for creating a [`ValidatorMonitor`].
#[derive(Clone, Debug)]
pub struct ValidatorMonitorOptions {
    /// GraphQL endpoint of the processor indexer.
    pub processor_url: Url,

    /// GraphQL endpoint of the cache indexer.
    pub cache_url: Url,

    /// Reputation below which a Reputation incident opens.
    pub reputation_floor: i64,
}

/// Collects the validator's statistics from the indexers and the node.
///
/// Every `monitor_*` operation owns a set of gauges. When it fails, it zeroes
/// those gauges before returning the error so a dashboard never shows a stale
/// reading.
pub struct ValidatorMonitor {
    node: Arc<ValidatorNode>,
    metrics: Arc<Metrics>,
    alerts: Arc<AlertController>,
    processor_url: Url,
    cache_url: Url,
    reputation_floor: i64,
    penalty_window: Mutex<PenaltyWindow>,
}

impl ValidatorMonitor {
    /// Creates a monitor for the validator behind `node`.
    #[must_use]
    pub fn new(
        node: Arc<ValidatorNode>,
        metrics: Arc<Metrics>,
        alerts: Arc<AlertController>,
        options: ValidatorMonitorOptions,
    ) -> Self {
        Self {
            node,
            metrics,
            alerts,
            processor_url: options.processor_url,
            cache_url: options.cache_url,
            reputation_floor: options.reputation_floor,
            penalty_window: Mutex::new(PenaltyWindow::default()),
        }
    }

    /// Current penalty watermark.
    pub fn penalty_window(&self) -> PenaltyWindow {
        *self.penalty_window.lock()
    }

    /// Runs every operation concurrently and logs their failures.
    pub async fn monitor_all(&self) {
        let (version, state, bond, reputation, penalties, observations) = tokio::join!(
            self.monitor_version(),
            self.monitor_state(),
            self.monitor_bond(),
            self.monitor_reputation(),
            self.monitor_penalties(),
            self.monitor_chain_observations(),
        );

        let results = [
            ("version", version),
            ("state", state),
            ("bond", bond),
            ("reputation", reputation),
            ("penalties", penalties),
            ("chain observations", observations),
        ];

        for (operation, result) in results {
            match result {
                Ok(()) => {}
                Err(e) if e.is_data_integrity() => {
                    warn!("{}: {} skipped: {}", VALIDATOR_CHAIN, operation, e);
                }
                Err(e) => error!("{}: {} failed: {}", VALIDATOR_CHAIN, operation, e),
            }
        }
    }

    /// Compares the node's version with the authorities' majority version.
    ///
    /// On a match the version is published and a Version heartbeat is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or the validator is unknown.
    pub async fn monitor_version(&self) -> Result<()> {
        let result = self.check_version().await;
        if result.is_err() {
            self.metrics.reset_version();
        }

        result
    }

    /// Publishes the validator's state flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the validator is unknown.
    pub async fn monitor_state(&self) -> Result<()> {
        let result = self.check_state().await;
        if result.is_err() {
            self.metrics.reset_state();
        }

        result
    }

    /// Publishes bond, rewards and the network's minimum active bid.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or the validator is unknown.
    pub async fn monitor_bond(&self) -> Result<()> {
        let result = self.check_bond().await;
        if result.is_err() {
            self.metrics.reset_bond();
        }

        result
    }

    /// Publishes the node's and the network's reputation and alerts when the
    /// node falls below the floor.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the validator is not active.
    pub async fn monitor_reputation(&self) -> Result<()> {
        let result = self.check_reputation().await;
        if result.is_err() {
            self.metrics.reset_reputation();
        }

        result
    }

    /// Publishes and alerts on the penalties applied since the last
    /// successful run.
    ///
    /// # Errors
    ///
    /// Returns an error if the node or the indexer cannot be queried; the
    /// watermark is then left where it was.
    pub async fn monitor_penalties(&self) -> Result<()> {
        self.metrics.reset_penalties();

        let result = self.check_penalties().await;
        if result.is_err() {
            self.metrics.reset_penalties();
        }

        result
    }

    /// Publishes the latest external block heights the validator witnessed.
    ///
    /// # Errors
    ///
    /// Returns an error if the node or the indexers cannot be queried.
    pub async fn monitor_chain_observations(&self) -> Result<()> {
        self.metrics.reset_observations();

        let result = self.check_chain_observations().await;
        if result.is_err() {
            self.metrics.reset_observations();
        }

        result
    }

    async fn check_version(&self) -> Result<()> {
        debug!("{}: checking if the node version is up to date", VALIDATOR_CHAIN);

        let (epoch, account) = tokio::join!(self.latest_epoch(), self.account());
        let (epoch, account) = (epoch?, account?);

        let node_version = account
            .validators
            .nodes
            .into_iter()
            .find_map(|validator| validator.cfe_version)
            .ok_or_else(|| {
                Error::Payload(format!("no version reported by '{}'", self.node.address()))
            })?;

        let majority = majority_version(
            epoch
                .memberships
                .nodes
                .iter()
                .filter_map(|membership| membership.validator.cfe_version.as_deref()),
        )
        .ok_or_else(|| Error::Payload(format!("no authority of epoch {} reports a version", epoch.id)))?;

        debug!("{}: majority version = {}", VALIDATOR_CHAIN, majority);

        if node_version != majority {
            warn!(
                "{}: node version '{}' differs from the majority version '{}'",
                VALIDATOR_CHAIN, node_version, majority
            );
            self.metrics.reset_version();
            return Ok(());
        }

        self.metrics.set_version(&node_version);
        info!("{}: node version is up to date: {}", VALIDATOR_CHAIN, node_version);
        self.alerts
            .send_heartbeat(VALIDATOR_CHAIN, HeartbeatType::Version)
            .await;

        Ok(())
    }

    async fn check_state(&self) -> Result<()> {
        debug!("{}: monitoring state", VALIDATOR_CHAIN);

        let validator = self.validator().await?;

        let flags = [
            ("authority", validator.is_current_authority),
            ("backup", validator.is_current_backup),
            ("qualified", validator.is_qualified),
            ("online", validator.is_online),
            ("bidding", validator.is_bidding),
            ("keyholder", validator.is_keyholder),
        ];
        for (state, value) in flags {
            self.metrics.set_state(state, value);
        }

        info!(
            "{}: state: authority = {}, backup = {}, qualified = {}, online = {}, bidding = {}, keyholder = {}",
            VALIDATOR_CHAIN,
            validator.is_current_authority,
            validator.is_current_backup,
            validator.is_qualified,
            validator.is_online,
            validator.is_bidding,
            validator.is_keyholder
        );

        Ok(())
    }

    async fn check_bond(&self) -> Result<()> {
        debug!("{}: monitoring bond", VALIDATOR_CHAIN);

        let (validator, epoch, auction) = tokio::join!(
            self.validator(),
            self.latest_epoch(),
            self.query::<AuctionInfo>(&self.cache_url, LATEST_AUCTION, json!({}))
        );
        let (validator, epoch) = (validator?, epoch?);
        let min_active_bid = auction?
            .auction
            .ok_or_else(|| Error::Payload("no auction indexed".to_string()))?
            .min_active_bid;

        // Only a running epoch has rewards still accruing.
        let epoch_reward = if epoch.end_block_id.is_none() {
            epoch
                .memberships
                .nodes
                .iter()
                .find(|membership| membership.validator.account.id_ss58 == self.node.address())
                .map_or(0.0, |membership| membership.reward)
        } else {
            0.0
        };

        let total = validator.locked_balance + validator.unlocked_balance;

        let bond = &self.metrics.node_bond;
        bond.with_label_values(&["locked"]).set(validator.locked_balance);
        bond.with_label_values(&["unlocked"]).set(validator.unlocked_balance);
        bond.with_label_values(&["total"]).set(total);

        let reward = &self.metrics.node_reward;
        reward.with_label_values(&["total"]).set(validator.total_rewards);
        reward.with_label_values(&["epoch"]).set(epoch_reward);

        self.metrics.network_min_active_bid.set(min_active_bid);

        info!(
            "{}: bond: locked = {}, unlocked = {}, total = {}; rewards: total = {}, epoch = {}; min active bid = {}",
            VALIDATOR_CHAIN,
            validator.locked_balance,
            validator.unlocked_balance,
            total,
            validator.total_rewards,
            epoch_reward,
            min_active_bid
        );

        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    async fn check_reputation(&self) -> Result<()> {
        debug!("{}: monitoring reputation", VALIDATOR_CHAIN);

        let validators = self.validators().await?;
        let address = self.node.address();

        let node = validators
            .iter()
            .find(|validator| validator.id_ss58 == address)
            .ok_or_else(|| Error::ValidatorNotFound(address.to_string()))?;
        if !node.is_active() {
            return Err(Error::NotActive(address.to_string()));
        }

        let points = validators
            .iter()
            .filter(|validator| validator.is_active())
            .map(|validator| validator.reputation_points as f64)
            .collect::<Vec<_>>();
        let distribution = ReputationDistribution::from_points(&points)
            .ok_or_else(|| Error::Payload("empty active set".to_string()))?;

        self.metrics
            .node_reputation
            .set(node.reputation_points as f64);

        let network = &self.metrics.network_reputation;
        network.with_label_values(&["best"]).set(distribution.best);
        network.with_label_values(&["worst"]).set(distribution.worst);
        network.with_label_values(&["average"]).set(distribution.average);
        network.with_label_values(&["median"]).set(distribution.median);
        network
            .with_label_values(&["worst_top10_threshold"])
            .set(distribution.worst_top10_threshold);

        info!(
            "{}: reputation: node = {}; network = {} (best), {} (median), {} (average), {} (worst top 10 threshold), {} (worst)",
            VALIDATOR_CHAIN,
            node.reputation_points,
            distribution.best,
            distribution.median,
            distribution.average,
            distribution.worst_top10_threshold,
            distribution.worst
        );

        if node.reputation_points < self.reputation_floor {
            let summary = format!(
                "reputation fell to {} points, below the floor of {}",
                format_thousands(node.reputation_points),
                format_thousands(self.reputation_floor)
            );
            self.alerts
                .raise(
                    VALIDATOR_CHAIN,
                    IncidentCategory::Reputation,
                    node.reputation_points as f64,
                    &summary,
                )
                .await;
        } else {
            self.alerts
                .resolve(VALIDATOR_CHAIN, IncidentCategory::Reputation)
                .await;
        }

        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    async fn check_penalties(&self) -> Result<()> {
        debug!("{}: checking if the node has been penalized", VALIDATOR_CHAIN);

        let current_height = self.node.rpc().sync_state().await?.height;
        let start_block = self.penalty_window.lock().start_block(current_height);

        let penalties = self
            .connection::<Penalty>(
                PENALTIES,
                "penalties",
                json!({ "first": PAGE_SIZE, "startBlockId": start_block }),
            )
            .await?;

        let address = self.node.address();
        let totals = penalties_by_reason(
            penalties
                .iter()
                .filter(|penalty| penalty.validator.account.id_ss58 == address)
                .map(|penalty| (penalty.reason.as_str(), penalty.amount)),
        );

        for (reason, amount) in &totals {
            self.metrics
                .node_penalty
                .with_label_values(&[reason.as_str()])
                .set(*amount as f64);
        }

        self.penalty_window.lock().advance(current_height);

        let total = totals.values().sum::<i64>();
        debug!(
            "{}: penalties in blocks {}..={}: {}",
            VALIDATOR_CHAIN,
            start_block + 1,
            current_height,
            total
        );

        if total > 0 {
            let reasons = totals.keys().map(String::as_str).collect::<Vec<_>>();
            let summary = format!(
                "penalized for {} reputation points: {}",
                format_thousands(total),
                reasons.join(", ")
            );
            self.alerts
                .raise(
                    VALIDATOR_CHAIN,
                    IncidentCategory::Penalty,
                    total as f64,
                    &summary,
                )
                .await;
        } else {
            self.alerts
                .resolve(VALIDATOR_CHAIN, IncidentCategory::Penalty)
                .await;
        }

        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    async fn check_chain_observations(&self) -> Result<()> {
        debug!("{}: monitoring chain observations", VALIDATOR_CHAIN);

        let (validator, account, state) = tokio::join!(
            self.validator(),
            self.account(),
            self.node.rpc().sync_state()
        );

        if !validator?.is_current_authority {
            debug!(
                "{}: not an authority, no chain observations to track",
                VALIDATOR_CHAIN
            );
            return Ok(());
        }

        let (account, current_height) = (account?, state?.height);

        let extrinsics = self
            .connection::<Extrinsic>(
                EXTRINSICS_BY_ACCOUNT,
                "extrinsics",
                json!({
                    "accountId": account.id,
                    "first": PAGE_SIZE,
                    "minBlock": current_height.saturating_sub(OBSERVATION_WINDOW_BLOCKS),
                    "maxBlock": current_height
                }),
            )
            .await?;

        let latest = latest_observations(
            extrinsics
                .iter()
                .filter(|extrinsic| extrinsic.success)
                .filter_map(|extrinsic| chain_tracking(&extrinsic.args))
                .map(|(chain, height)| (chain.to_string(), height)),
        );

        for (chain, height) in &latest {
            info!(
                "{}: observed {} block height = {}",
                VALIDATOR_CHAIN, chain, height
            );
            self.metrics
                .node_observed_block_height
                .with_label_values(&[chain.as_str()])
                .set(*height as f64);
        }

        Ok(())
    }

    async fn query<T: DeserializeOwned>(&self, url: &Url, query: &str, variables: Value) -> Result<T> {
        let data = self
            .node
            .rpc()
            .client()
            .graphql(url, query, variables)
            .await?;

        Ok(serde_json::from_value(data)?)
    }

    /// Fetches every page of the connection at `key` from the processor.
    async fn connection<T: DeserializeOwned>(
        &self,
        query: &str,
        key: &str,
        mut variables: Value,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();

        loop {
            let mut data = self
                .node
                .rpc()
                .client()
                .graphql(&self.processor_url, query, variables.clone())
                .await?;

            let page = data
                .get_mut(key)
                .map(Value::take)
                .ok_or_else(|| Error::Payload(format!("missing '{key}' in response")))?;
            let connection: Connection<T> = serde_json::from_value(page)?;

            items.extend(connection.edges.into_iter().map(|edge| edge.node));

            match connection.page_info.end_cursor {
                Some(cursor) if connection.page_info.has_next_page => {
                    variables["after"] = Value::String(cursor);
                }
                _ => break,
            }
        }

        Ok(items)
    }

    async fn latest_epoch(&self) -> Result<Epoch> {
        let info = self
            .query::<AuthorityInfo>(&self.processor_url, ACTIVE_AUTHORITY_INFO, json!({}))
            .await?;

        info.epoch
            .nodes
            .into_iter()
            .next()
            .ok_or_else(|| Error::Payload("no epoch indexed".to_string()))
    }

    async fn account(&self) -> Result<Account> {
        let address = self.node.address();
        let info = self
            .query::<AccountInfo>(
                &self.processor_url,
                VALIDATOR_ACCOUNT,
                json!({ "idSs58": address }),
            )
            .await?;

        info.accounts
            .nodes
            .into_iter()
            .next()
            .ok_or_else(|| Error::ValidatorNotFound(address.to_string()))
    }

    async fn validator(&self) -> Result<ValidatorRecord> {
        let address = self.node.address();
        let validators = self
            .query::<CacheValidators>(&self.cache_url, VALIDATOR_BY_ID, json!({ "idSs58": address }))
            .await?;

        validators
            .validators
            .nodes
            .into_iter()
            .find(|validator| validator.id_ss58 == address)
            .ok_or_else(|| Error::ValidatorNotFound(address.to_string()))
    }

    async fn validators(&self) -> Result<Vec<ValidatorRecord>> {
        let validators = self
            .query::<CacheValidators>(&self.cache_url, VALIDATORS, json!({}))
            .await?;

        Ok(validators.validators.nodes)
    }
}
