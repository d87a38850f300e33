//! Control-plane gateway: the WebSocket entry point for announce commands.
//!
//! An axum WebSocket server on a loopback-default bind address. Each binary
//! frame carries one postcard-encoded [`ControlMessage`]; the gateway routes
//! `Announce` requests onto the target worker's inbound queue and answers
//! with `Ack` or `Rejected`. Delivery is fire-and-forget at-most-once: an
//! `Ack` means "queued", never "delivered" — per-channel failures surface
//! only in the daemon's logs.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::mpsc;

use hailer_proto::command::AnnounceCommand;
use hailer_proto::control::{self, ControlMessage};

/// Shared gateway state: the worker registry and the daemon stop handle.
pub struct GatewayState {
    /// Maps network id to the inbound queue of its worker.
    registry: HashMap<String, mpsc::Sender<AnnounceCommand>>,
    /// Signals the supervisor that a control client requested shutdown.
    stop: mpsc::Sender<()>,
}

impl GatewayState {
    /// Creates gateway state over a fixed worker registry.
    ///
    /// The registry is immutable for the daemon's lifetime — workers are
    /// neither added nor removed while running.
    #[must_use]
    pub fn new(
        registry: HashMap<String, mpsc::Sender<AnnounceCommand>>,
        stop: mpsc::Sender<()>,
    ) -> Self {
        Self { registry, stop }
    }
}

/// Handles an upgraded WebSocket connection for one control client.
///
/// Processes binary frames sequentially, replying to each with exactly one
/// `Ack` or `Rejected` frame. Non-binary frames are ignored.
async fn handle_socket(mut socket: WebSocket, state: Arc<GatewayState>) {
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Binary(data) => {
                let reply = handle_frame(&data, &state).await;
                match control::encode(&reply) {
                    Ok(bytes) => {
                        if socket.send(Message::Binary(bytes.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode control reply");
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {
                // Ignore text, ping, pong frames.
            }
        }
    }
}

/// Decodes and executes one control frame, returning the reply.
async fn handle_frame(data: &[u8], state: &GatewayState) -> ControlMessage {
    let msg = match control::decode(data) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "undecodable control frame");
            return ControlMessage::Rejected {
                reason: format!("undecodable control frame: {e}"),
            };
        }
    };

    match msg {
        ControlMessage::Announce { network, command } => {
            let Some(sender) = state.registry.get(&network) else {
                tracing::warn!(network = %network, "announce for unknown network");
                return ControlMessage::Rejected {
                    reason: format!("unknown network {network:?}"),
                };
            };

            if sender.send(command).await.is_err() {
                tracing::warn!(network = %network, "announce for stopped worker");
                return ControlMessage::Rejected {
                    reason: format!("network {network:?} worker is not running"),
                };
            }

            tracing::debug!(network = %network, "announce queued");
            ControlMessage::Ack
        }
        ControlMessage::Shutdown => {
            tracing::info!("shutdown requested via control socket");
            let _ = state.stop.send(()).await;
            ControlMessage::Ack
        }
        ControlMessage::Ack | ControlMessage::Rejected { .. } => ControlMessage::Rejected {
            reason: "unexpected reply-role control message".to_string(),
        },
    }
}

/// Starts the control gateway on the given address and returns the bound
/// address and a join handle.
///
/// This is the primary entry point used by both the supervisor and test
/// code; binding to port 0 yields an OS-assigned port.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_gateway(
    addr: &str,
    state: Arc<GatewayState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/control", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "control gateway error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<GatewayState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
