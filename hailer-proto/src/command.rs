//! The announce command value object and its sentinel values.
//!
//! An [`AnnounceCommand`] is created by an external caller, delivered to
//! exactly one network worker, consumed once, and discarded. The `pings`
//! and `targets` lists carry sentinel entries that are resolved against
//! the live channel roster at dispatch time, not at submission time.

use serde::{Deserialize, Serialize};

/// Ping sentinel: mention every member currently in the channel.
pub const PING_EVERYONE: &str = "*";

/// Ping sentinel: mention only members flagged as channel operators.
pub const PING_OPERATORS: &str = "@";

/// Target sentinel: deliver to every channel the network currently has joined.
pub const TARGET_ALL: &str = "*";

/// A request to post a message (with an optional mention line) to one or
/// more channels on a single network.
///
/// Sentinel resolution is a list scan: in `pings`, the first
/// [`PING_EVERYONE`] or [`PING_OPERATORS`] entry found decides the mention
/// mode, and a list with neither is used as an explicit name list. In
/// `targets`, [`TARGET_ALL`] short-circuits any other listed channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnounceCommand {
    /// Who to mention before the text: `"*"`, `"@"`, or explicit names.
    pub pings: Vec<String>,
    /// Destination channels: `"*"` or explicit channel names.
    pub targets: Vec<String>,
    /// The announce text, sent as its own message after the mention line.
    pub text: String,
}

impl AnnounceCommand {
    /// Creates a command with explicit ping and target lists.
    #[must_use]
    pub fn new(
        pings: impl IntoIterator<Item = impl Into<String>>,
        targets: impl IntoIterator<Item = impl Into<String>>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            pings: pings.into_iter().map(Into::into).collect(),
            targets: targets.into_iter().map(Into::into).collect(),
            text: text.into(),
        }
    }
}
