//! Control socket wire protocol for the hailer daemon.
//!
//! Defines the [`ControlMessage`] enum that is postcard-encoded and sent
//! over WebSocket binary frames between control clients (`hailerctl`) and
//! the daemon's gateway.

use serde::{Deserialize, Serialize};

use crate::command::AnnounceCommand;

/// Messages exchanged between control clients and the daemon gateway.
///
/// The protocol is fire-and-forget at-most-once: an [`ControlMessage::Ack`]
/// means the command was placed on the target worker's queue, not that any
/// channel message was delivered. Per-channel failures surface only in the
/// daemon's logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Submit an announce command to the named network's worker.
    Announce {
        /// Identifier of a configured, running network.
        network: String,
        /// The command to queue.
        command: AnnounceCommand,
    },

    /// Request a graceful daemon shutdown.
    Shutdown,

    /// The daemon accepted the request.
    Ack,

    /// The daemon rejected the request (unknown network, stopped worker,
    /// or an undecodable frame).
    Rejected {
        /// Human-readable reason.
        reason: String,
    },
}

/// Error type for control codec operations.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Serialization or deserialization failed.
    #[error("control codec error: {0}")]
    Codec(String),
}

/// Encodes a [`ControlMessage`] into bytes using postcard.
///
/// # Errors
///
/// Returns [`ControlError::Codec`] if the message cannot be serialized.
pub fn encode(msg: &ControlMessage) -> Result<Vec<u8>, ControlError> {
    postcard::to_allocvec(msg).map_err(|e| ControlError::Codec(e.to_string()))
}

/// Decodes a [`ControlMessage`] from bytes using postcard.
///
/// # Errors
///
/// Returns [`ControlError::Codec`] if the bytes cannot be deserialized.
pub fn decode(bytes: &[u8]) -> Result<ControlMessage, ControlError> {
    postcard::from_bytes(bytes).map_err(|e| ControlError::Codec(e.to_string()))
}
