use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vigil_chain_probe::{ChainProbe, RpcNode};
use vigil_metrics::Metrics;
use vigil_oncall::{
    AlertController, AlertControllerOptions, BetterStack, DEFAULT_INCIDENT_RETENTION,
    HeartbeatSettings, Hysteresis,
};
use vigil_rpc::NodeClient;
use vigil_validator_stats::{
    ValidatorMonitor, ValidatorMonitorOptions, ValidatorNode, ValidatorNodeOptions,
};

use crate::config::Args;
use crate::error::Result;
use crate::server;

/// Timing and listen options of an [`Orchestrator`].
#[derive(Clone, Copy, Debug)]
pub struct OrchestratorOptions {
    /// Interval of the node and validator cycles.
    pub cycle_interval: Duration,

    /// Interval of the incident cleanup.
    pub cleanup_interval: Duration,

    /// Listen address of the metrics server.
    pub metrics_addr: SocketAddr,
}

/// Owns every probe and drives the periodic cycles.
pub struct Orchestrator {
    probes: Vec<Arc<dyn ChainProbe>>,
    validator: ValidatorMonitor,
    alerts: Arc<AlertController>,
    metrics: Arc<Metrics>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    /// Creates an orchestrator from already wired components.
    #[must_use]
    pub fn new(
        probes: Vec<Arc<dyn ChainProbe>>,
        validator: ValidatorMonitor,
        alerts: Arc<AlertController>,
        metrics: Arc<Metrics>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            probes,
            validator,
            alerts,
            metrics,
            options,
        }
    }

    /// Wires the validator node and every configured chain node.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry or an HTTP client cannot be built.
    pub fn from_args(args: &Args) -> Result<Self> {
        let metrics = Arc::new(Metrics::new()?);
        let alerts = Arc::new(alert_controller(args, args.alerting_enabled())?);
        let client = NodeClient::new(args.request_timeout())?;

        let validator_node = Arc::new(ValidatorNode::new(
            ValidatorNodeOptions {
                address: args.validator_address.clone(),
                url: args.validator_endpoint.clone(),
                reference_url: args.validator_reference_endpoint.clone(),
            },
            client.clone(),
            metrics.clone(),
            alerts.clone(),
        ));

        let mut probes: Vec<Arc<dyn ChainProbe>> = vec![validator_node.clone()];
        for (chain, url, reference_url) in args.chains() {
            info!("monitoring {} node at {}", chain, url);

            probes.push(Arc::new(RpcNode::new(
                chain.options(url, Some(reference_url)),
                client.clone(),
                metrics.clone(),
                alerts.clone(),
            )));
        }

        let validator = ValidatorMonitor::new(
            validator_node,
            metrics.clone(),
            alerts.clone(),
            ValidatorMonitorOptions {
                processor_url: args.processor_endpoint.clone(),
                cache_url: args.cache_endpoint.clone(),
                reputation_floor: args.reputation_floor,
            },
        );

        Ok(Self::new(
            probes,
            validator,
            alerts,
            metrics,
            OrchestratorOptions {
                cycle_interval: args.cycle_interval(),
                cleanup_interval: args.cleanup_interval(),
                metrics_addr: args.metrics_addr,
            },
        ))
    }

    /// Gauges written by the probes.
    #[must_use]
    pub const fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Creates the missing heartbeats, node by node in wiring order.
    pub async fn init_heartbeats(&self) {
        if !self.alerts.is_enabled() {
            return;
        }

        info!("setting up heartbeats");
        for probe in &self.probes {
            self.alerts
                .init_heartbeats(probe.name(), probe.heartbeats())
                .await;
        }
    }

    /// Checks liveness and sync of every node concurrently.
    pub async fn run_node_cycle(&self) {
        debug!("starting node cycle");

        let checks = self.probes.iter().map(|probe| async move {
            let (up, synced) = tokio::join!(probe.is_up(), probe.is_synced());
            debug!("{}: up = {}, synced = {}", probe.name(), up, synced);
        });

        join_all(checks).await;
    }

    /// Runs the validator-specific checks.
    pub async fn run_validator_cycle(&self) {
        debug!("starting validator cycle");

        self.validator.monitor_all().await;
    }

    /// Deletes every incident except the most recent ones.
    pub async fn run_cleanup(&self) {
        self.alerts.cleanup(DEFAULT_INCIDENT_RETENTION).await;
    }

    /// Serves metrics and runs every cycle until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics server fails.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let server = server::serve(
            self.options.metrics_addr,
            self.metrics.clone(),
            shutdown.clone(),
        );

        // Heartbeat setup retries until the on-call service answers; it runs
        // beside the cycles.
        let monitoring = async {
            tokio::join!(
                self.init_heartbeats(),
                every(self.options.cycle_interval, || self.run_node_cycle()),
                every(self.options.cycle_interval, || self.run_validator_cycle()),
                every(self.options.cleanup_interval, || self.run_cleanup()),
            );
        };

        tokio::select! {
            result = server => result?,
            () = monitoring => {}
            () = shutdown.cancelled() => info!("monitoring stopped"),
        }

        Ok(())
    }
}

/// Builds the alert controller, talking to the on-call service only when
/// `enabled` and an API key is configured.
///
/// # Errors
///
/// Returns an error if the on-call HTTP client cannot be built.
pub fn alert_controller(args: &Args, enabled: bool) -> Result<AlertController> {
    let options = AlertControllerOptions {
        node_address: args.validator_address.clone(),
        heartbeat_settings: HeartbeatSettings::default(),
        hysteresis: Hysteresis::default(),
    };

    match (&args.betterstack_api_key, enabled) {
        (Some(api_key), true) => {
            let client = BetterStack::new(
                api_key,
                &args.betterstack_base_url,
                &args.requester_email,
                args.request_timeout(),
            )?;

            Ok(AlertController::new(client, options))
        }
        _ => {
            info!(
                "alerting disabled (environment = {}, api key set = {})",
                args.environment,
                args.betterstack_api_key.is_some()
            );

            Ok(AlertController::disabled(options))
        }
    }
}

/// Runs `cycle` now and then every `period`, skipping ticks missed while a
/// cycle was still running.
async fn every<F, Fut>(period: Duration, cycle: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        cycle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_every_runs_immediately_then_per_period() {
        let runs = AtomicUsize::new(0);
        let runs = &runs;

        let ticker = every(Duration::from_secs(180), move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
        });

        let _ = tokio::time::timeout(Duration::from_secs(361), ticker).await;

        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_skips_ticks_missed_by_a_slow_cycle() {
        let runs = AtomicUsize::new(0);
        let runs = &runs;

        let ticker = every(Duration::from_secs(10), move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(25)).await;
        });

        // The first run overruns two ticks and only one late run follows it.
        let _ = tokio::time::timeout(Duration::from_secs(35), ticker).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
