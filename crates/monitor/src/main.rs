//! Validator monitoring and alerting daemon.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vigil_monitor::{Args, Command, Error, purge, run};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match args.command.unwrap_or_default() {
        Command::Run => {
            let shutdown_token = CancellationToken::new();

            let signal_shutdown_token = shutdown_token.clone();
            tokio::spawn(async move {
                wait_for_signal().await;

                info!("Shutting down");
                signal_shutdown_token.cancel();
            });

            run(&args, shutdown_token).await
        }
        Command::Purge => purge(&args).await,
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            error!("failed to install signal handlers: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            info!("Received interrupt signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received interrupt signal");
}
