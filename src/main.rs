//! Port Mapper binary.
//!
//! Loads configuration, wires the reqwest-backed adapters into the
//! reconciler, and runs the sync loop until Ctrl+C. Missing configuration
//! is fatal before the loop ever starts.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use port_mapper::adapters::opnsense::OpnsenseClient;
use port_mapper::adapters::pterodactyl::PterodactylClient;
use port_mapper::application::{Reconciler, Scheduler};
use port_mapper::config::AppConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = config.validate() {
        error!(error = %err, "invalid configuration");
        std::process::exit(1);
    }

    let excluded = config.sync.excluded_ports();
    info!(
        alias = %config.firewall.alias_name,
        interval_secs = config.sync.interval_secs,
        excluded_ports = ?excluded,
        "port mapper starting"
    );

    let timeout = config.sync.request_timeout();
    let source = Arc::new(PterodactylClient::new(&config.panel, timeout));
    let store = Arc::new(OpnsenseClient::new(&config.firewall, timeout));

    let reconciler = Reconciler::new(
        source,
        store,
        config.firewall.alias_name.clone(),
        excluded,
    );
    let scheduler = Scheduler::new(reconciler, config.sync.interval());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, finishing current cycle");
            let _ = shutdown_tx.send(true);
        }
    });

    scheduler.run(shutdown_rx).await;
}
