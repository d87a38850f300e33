//! Daemon supervisor: worker startup, shutdown broadcast, and the
//! wait-for-all barrier.
//!
//! The supervisor validates the configured network set, launches one
//! [`NetworkWorker`] per network with a fresh inbound queue, starts the
//! control gateway over the resulting registry, and then blocks until an
//! OS signal or a control-plane stop request arrives. Shutdown is a
//! one-shot broadcast: the gateway stops accepting commands first, then
//! every worker drains and releases its connection before the process
//! exits — no worker is abandoned, no connection leaks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::chat::ChatConnection;
use crate::config::{DaemonConfig, NetworkConfig};
use crate::gateway::{self, GatewayState};
use crate::worker::NetworkWorker;

/// Capacity of each worker's inbound command queue.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Errors fatal to daemon startup. The daemon never runs partially
/// configured: any of these aborts the whole startup sequence.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// A network entry has an empty identifier.
    #[error("empty network id specified")]
    EmptyNetworkId,

    /// Two network entries share an identifier.
    #[error("duplicate network id {0:?}")]
    DuplicateNetworkId(String),

    /// The control gateway could not bind its listener.
    #[error("failed to start control gateway: {0}")]
    Gateway(String),
}

/// A running daemon: the control address plus the pieces needed to stop it.
pub struct DaemonHandle {
    /// Address the control gateway actually bound (useful with port 0).
    pub control_addr: std::net::SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    stop_rx: mpsc::Receiver<()>,
    workers: JoinSet<()>,
    gateway: tokio::task::JoinHandle<()>,
}

impl DaemonHandle {
    /// Completes when a control client requests shutdown (or the gateway
    /// is gone, which is equally terminal).
    pub async fn stop_requested(&mut self) {
        let _ = self.stop_rx.recv().await;
    }

    /// Stops the gateway, broadcasts shutdown, and waits until every
    /// worker has drained and released its connection.
    pub async fn shutdown(mut self) {
        // Stop command intake before the broadcast, so no announce can
        // land on a queue whose worker is already draining.
        self.gateway.abort();
        let _ = self.gateway.await;

        let _ = self.shutdown_tx.send(true);
        while self.workers.join_next().await.is_some() {}

        tracing::info!("all network workers closed");
    }
}

/// Validates ids, launches all workers and the gateway, and returns a
/// handle to the running daemon.
///
/// The `connector` builds one [`ChatConnection`] per network; each worker
/// owns its connection exclusively.
///
/// # Errors
///
/// Returns [`DaemonError`] if any network id is empty or duplicated, or
/// if the gateway listener cannot bind.
pub async fn spawn<C, F>(config: &DaemonConfig, connector: F) -> Result<DaemonHandle, DaemonError>
where
    C: ChatConnection,
    F: Fn(&NetworkConfig) -> C,
{
    validate(&config.networks)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (stop_tx, stop_rx) = mpsc::channel(1);

    let mut registry = HashMap::new();
    let mut workers = JoinSet::new();
    for net in &config.networks {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        registry.insert(net.id.clone(), cmd_tx);

        let worker = NetworkWorker::new(
            Arc::new(net.clone()),
            connector(net),
            cmd_rx,
            shutdown_rx.clone(),
        );
        workers.spawn(worker.run());
    }

    let state = Arc::new(GatewayState::new(registry, stop_tx));
    let (control_addr, gateway) = gateway::start_gateway(&config.control_addr, state)
        .await
        .map_err(|e| DaemonError::Gateway(e.to_string()))?;

    tracing::info!(
        addr = %control_addr,
        networks = config.networks.len(),
        "daemon started"
    );

    Ok(DaemonHandle {
        control_addr,
        shutdown_tx,
        stop_rx,
        workers,
        gateway,
    })
}

/// Runs the daemon until an OS interrupt/terminate signal or a
/// control-plane stop request, then shuts down cleanly.
///
/// # Errors
///
/// Returns [`DaemonError`] if startup fails; the daemon does not run in a
/// partially-initialized state.
pub async fn run<C, F>(config: &DaemonConfig, connector: F) -> Result<(), DaemonError>
where
    C: ChatConnection,
    F: Fn(&NetworkConfig) -> C,
{
    let mut handle = spawn(config, connector).await?;
    wait_for_termination(&mut handle).await;
    handle.shutdown().await;
    Ok(())
}

/// Blocks until SIGINT/SIGTERM or a control-plane stop request.
async fn wait_for_termination(handle: &mut DaemonHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                handle.stop_requested().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("received interrupt"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            () = handle.stop_requested() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received interrupt"),
        () = handle.stop_requested() => {}
    }
}

/// Enforces the startup invariants: every id non-empty and unique.
fn validate(networks: &[NetworkConfig]) -> Result<(), DaemonError> {
    let mut seen = HashSet::new();
    for net in networks {
        if net.id.is_empty() {
            return Err(DaemonError::EmptyNetworkId);
        }
        if !seen.insert(net.id.as_str()) {
            return Err(DaemonError::DuplicateNetworkId(net.id.clone()));
        }
    }
    Ok(())
}
