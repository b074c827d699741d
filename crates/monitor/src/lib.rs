//! Wiring and scheduling of the vigil monitoring engine.
//!
//! [`Orchestrator`] builds every probe from the command-line [`Args`], runs
//! the node and validator cycles plus the hourly incident cleanup, and serves
//! the gauges over HTTP.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod config;
mod error;
mod orchestrator;
mod server;

pub use config::{Args, Command, PRODUCTION};
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorOptions, alert_controller};
pub use server::{router, serve};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Monitors the configured nodes until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the engine cannot be wired or the metrics server fails.
pub async fn run(args: &Args, shutdown: CancellationToken) -> Result<()> {
    let orchestrator = Orchestrator::from_args(args)?;

    info!(
        "starting monitoring of validator {} every {}s",
        args.validator_address, args.cycle_interval_secs
    );

    orchestrator.run(shutdown).await
}

/// Deletes every heartbeat, heartbeat group and incident on the on-call
/// account, regardless of the environment.
///
/// # Errors
///
/// Returns an error if the on-call service cannot be reached.
pub async fn purge(args: &Args) -> Result<()> {
    if args.betterstack_api_key.is_none() {
        warn!("no Better Stack API key configured, nothing to purge");
        return Ok(());
    }

    alert_controller(args, true)?.purge().await?;
    info!("purged every heartbeat, heartbeat group and incident");

    Ok(())
}
