//! hailerctl -- submit commands to a running hailer daemon.
//!
//! Connects to the daemon's control socket over WebSocket, sends one
//! postcard-encoded request, and prints the daemon's reply.
//!
//! # Usage
//!
//! ```bash
//! # Announce to #ops on network "alpha", mentioning the operators
//! hailerctl announce --network alpha --ping "@" --target "#ops" "deploy starting"
//!
//! # Announce everywhere, mentioning everyone
//! hailerctl announce --network alpha --ping "*" --target "*" "all clear"
//!
//! # Ask the daemon to shut down
//! hailerctl shutdown
//! ```

use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use hailer_proto::command::AnnounceCommand;
use hailer_proto::control::{self, ControlMessage};

/// CLI arguments for the control client.
#[derive(Parser, Debug)]
#[command(version, about = "hailer control client")]
struct CtlArgs {
    /// WebSocket URL of the daemon's control socket.
    #[arg(
        short,
        long,
        env = "HAILER_CONTROL_URL",
        default_value = "ws://127.0.0.1:7330/control"
    )]
    addr: String,

    #[command(subcommand)]
    command: CtlCommand,
}

#[derive(Subcommand, Debug)]
enum CtlCommand {
    /// Queue an announce on one network.
    Announce {
        /// Target network id.
        #[arg(short, long)]
        network: String,

        /// Ping target: "*" (everyone), "@" (operators), or a name.
        /// Repeatable.
        #[arg(short, long = "ping")]
        pings: Vec<String>,

        /// Destination channel, or "*" for every joined channel.
        /// Repeatable.
        #[arg(short, long = "target")]
        targets: Vec<String>,

        /// The announce text.
        text: String,
    },

    /// Request a graceful daemon shutdown.
    Shutdown,
}

#[tokio::main]
async fn main() {
    let args = CtlArgs::parse();

    let request = match args.command {
        CtlCommand::Announce {
            network,
            pings,
            targets,
            text,
        } => ControlMessage::Announce {
            network,
            command: AnnounceCommand {
                pings,
                targets,
                text,
            },
        },
        CtlCommand::Shutdown => ControlMessage::Shutdown,
    };

    match submit(&args.addr, &request).await {
        Ok(ControlMessage::Ack) => println!("accepted"),
        Ok(ControlMessage::Rejected { reason }) => {
            eprintln!("rejected: {reason}");
            std::process::exit(1);
        }
        Ok(other) => {
            eprintln!("unexpected reply: {other:?}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

/// Sends one request frame and waits for the daemon's reply.
async fn submit(addr: &str, request: &ControlMessage) -> Result<ControlMessage, String> {
    let (mut ws, _) = tokio_tungstenite::connect_async(addr)
        .await
        .map_err(|e| format!("connect to {addr} failed: {e}"))?;

    let bytes = control::encode(request).map_err(|e| e.to_string())?;
    ws.send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| format!("send failed: {e}"))?;

    while let Some(frame) = ws.next().await {
        let frame = frame.map_err(|e| format!("receive failed: {e}"))?;
        match frame {
            Message::Binary(data) => {
                return control::decode(&data).map_err(|e| e.to_string());
            }
            Message::Close(_) => break,
            _ => {
                // Skip ping/pong/text frames.
            }
        }
    }

    Err("connection closed before a reply arrived".to_string())
}
