//! Per-network worker: connection supervision and command consumption.
//!
//! Each worker owns exactly one [`ChatConnection`] for the lifetime of one
//! configured network. Its run loop moves through `Connecting → Ready ⇄
//! Draining → Closed`: a dedicated connect task retries until a session is
//! up, re-issues the configured auto-joins, and then watches the session —
//! when it drops, the task re-enters Connecting, so the connection is
//! persistent across network failures. The run loop concurrently consumes
//! the inbound command queue, so connection retries never block command
//! intake. Commands handled while disconnected resolve against an empty
//! roster and are dropped with a warning — an accepted limitation, not a
//! redelivery queue.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use hailer_proto::command::AnnounceCommand;

use crate::chat::ChatConnection;
use crate::config::NetworkConfig;
use crate::dispatch;

/// Supervises one network's connection and inbound command queue.
pub struct NetworkWorker<C> {
    config: Arc<NetworkConfig>,
    conn: Arc<C>,
    commands: mpsc::Receiver<AnnounceCommand>,
    shutdown: watch::Receiver<bool>,
}

impl<C: ChatConnection> NetworkWorker<C> {
    /// Creates a worker from its connection, inbound queue, and the shared
    /// shutdown broadcast.
    pub fn new(
        config: Arc<NetworkConfig>,
        conn: C,
        commands: mpsc::Receiver<AnnounceCommand>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            conn: Arc::new(conn),
            commands,
            shutdown,
        }
    }

    /// Runs the worker to completion.
    ///
    /// Returns only after the connection has been closed and the connect
    /// task has finished — the supervisor's wait barrier relies on this.
    pub async fn run(self) {
        let span = tracing::info_span!("network", id = %self.config.id);
        self.run_inner().instrument(span).await;
    }

    async fn run_inner(mut self) {
        tracing::info!(
            hostname = %self.config.hostname,
            port = self.config.port,
            "starting network worker"
        );

        // Connecting runs as its own task so retries never block intake.
        // It is cancelled locally: the shutdown broadcast never arrives on
        // the queue-close drain path.
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let connect_task = tokio::spawn(
            connect_loop(Arc::clone(&self.conn), Arc::clone(&self.config), cancel_rx)
                .instrument(tracing::Span::current()),
        );

        // Ready: consume commands until the shutdown broadcast, or until
        // the queue is closed from the coordinating shutdown path.
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => dispatch::dispatch(self.conn.as_ref(), &cmd).await,
                    None => break,
                },
            }
        }

        // Draining: stop the connect task, release the connection.
        let _ = cancel_tx.send(true);
        self.conn.close().await;
        if let Err(e) = connect_task.await {
            tracing::error!(error = %e, "connect task panicked");
        }

        tracing::info!("network worker closed");
    }
}

/// Keeps the network session alive until cancelled: retries `connect`
/// until it succeeds, issues the configured auto-joins, then watches the
/// session and re-enters the connect phase whenever it drops.
///
/// Retries are immediate; the cancel check happens on every iteration so a
/// worker stuck in `Connecting` still drains promptly.
async fn connect_loop<C: ChatConnection>(
    conn: Arc<C>,
    config: Arc<NetworkConfig>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        if *cancel.borrow() {
            return;
        }

        tokio::select! {
            _ = cancel.changed() => return,
            res = conn.connect() => match res {
                Ok(()) => {
                    tracing::info!("connected");
                    auto_join(conn.as_ref(), &config).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "connect failed, retrying");
                    continue;
                }
            },
        }

        // Ready: watch the established session until it dies.
        tokio::select! {
            _ = cancel.changed() => return,
            () = conn.wait_disconnect() => {
                tracing::warn!("connection lost, reconnecting");
            }
        }
    }
}

/// Joins every configured channel, with its key where one is set.
///
/// Join failures are logged and do not block the remaining joins.
async fn auto_join<C: ChatConnection>(conn: &C, config: &NetworkConfig) {
    for (channel, key) in config.channel_entries() {
        if let Err(e) = conn.join(channel, key).await {
            tracing::warn!(channel = %channel, error = %e, "auto-join failed");
        }
    }
}
