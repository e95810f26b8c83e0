use crate::config::parse::{load_config, ConfigError};
use crate::config::types::Config;
use crate::host::{max_line_bytes, read_host_events, EventRouter, HostEvent, HostNameResolver};
use crate::remote::{HttpLogsClient, RemoteError};
use crate::shipper::{BatchRegistry, Sweeper};
use crate::status::{start_server, StatusState};
use futures::Stream;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("remote client error: {0}")]
    Remote(#[from] RemoteError),

    #[error("invalid status listen address: {0}")]
    StatusAddr(#[from] std::net::AddrParseError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/logship/config.yml");
            eprintln!("  /etc/logship/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'logship config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_from_stdin(&config_path).await.map_err(|e| e.into())
}

async fn run_from_stdin(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let max_line = max_line_bytes(&config.batching.limits());
    run_shipper(config, read_host_events(tokio::io::stdin(), max_line), cancel).await
}

/// Ships `events` until the stream ends or `cancel` fires, then flushes and
/// unregisters every source
pub async fn run_shipper<S>(
    config: Config,
    events: S,
    cancel: CancellationToken,
) -> Result<(), RunError>
where
    S: Stream<Item = HostEvent>,
{
    let client = Arc::new(HttpLogsClient::new(&config.remote)?);
    info!(endpoint = %client.endpoint(), "Routing logs to remote");

    let registry = Arc::new(BatchRegistry::new(
        client.clone(),
        client,
        config.batching.limits(),
        config.remote.call_timeout,
    ));
    let resolver = Arc::new(HostNameResolver::from_config(&config.destination));
    info!(group = %resolver.group(), "Default log group");

    // Stopped after the router so that no sweep races the final flush
    let background = CancellationToken::new();

    let sweeper_handle =
        Sweeper::new(Arc::clone(&registry), config.batching.sweep_interval).spawn(background.clone());

    let status_handle = match &config.status {
        Some(status) => {
            let addr: SocketAddr = status.listen.parse()?;
            let state = Arc::new(StatusState::new(Arc::clone(&registry)));
            Some(tokio::spawn(start_server(addr, state, background.clone())))
        }
        None => None,
    };

    info!("Shipper started, reading host events");
    let router = EventRouter::new(Arc::clone(&registry), resolver);
    router.run(events, cancel).await;

    info!("Shutting down");
    background.cancel();
    if let Err(e) = sweeper_handle.await {
        error!(error = %e, "Sweeper task join error");
    }

    let sources = registry.shutdown().await;
    let stats = registry.stats().snapshot();
    info!(
        sources = sources,
        submitted = stats.events_submitted,
        dropped = stats.events_dropped + stats.events_oversized,
        "Final flush complete"
    );

    if let Some(handle) = status_handle {
        match handle.await {
            Ok(Ok(())) => info!("Status server stopped gracefully"),
            Ok(Err(e)) => error!(error = %e, "Status server error"),
            Err(e) => error!(error = %e, "Status server task join error"),
        }
    }

    Ok(())
}
