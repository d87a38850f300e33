//! Announce command resolution and dispatch.
//!
//! Resolution happens against the live roster at dispatch time: the target
//! list and ping mode are computed first, then each destination channel is
//! handled independently — an unknown channel is skipped with a warning and
//! never aborts the rest of the command.

use hailer_proto::command::{AnnounceCommand, PING_EVERYONE, PING_OPERATORS, TARGET_ALL};

use crate::chat::{ChatConnection, Member};

/// How the mention line for a command is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingMode {
    /// Mention every current member of the destination channel.
    Everyone,
    /// Mention only members flagged as channel operators.
    Operators,
    /// Mention the literal ping list verbatim, regardless of membership.
    Explicit,
}

/// Resolves the destination channel list for a command.
///
/// A [`TARGET_ALL`] entry short-circuits the scan: the result becomes the
/// currently joined channel list, discarding any literal targets around it.
#[must_use]
pub fn resolve_targets(requested: &[String], joined: Vec<String>) -> Vec<String> {
    let mut targets = Vec::new();
    for target in requested {
        if target == TARGET_ALL {
            return joined;
        }
        targets.push(target.clone());
    }
    targets
}

/// Resolves the ping mode by scanning the list in order: the first
/// sentinel found ([`PING_EVERYONE`] or [`PING_OPERATORS`]) decides the
/// mode; a list with no sentinel is the explicit name list.
#[must_use]
pub fn resolve_ping_mode(pings: &[String]) -> PingMode {
    for ping in pings {
        if ping == PING_EVERYONE {
            return PingMode::Everyone;
        }
        if ping == PING_OPERATORS {
            return PingMode::Operators;
        }
    }
    PingMode::Explicit
}

/// Builds the space-joined mention line for one destination channel.
///
/// Returns `None` only for [`PingMode::Operators`] with no current
/// operators — the mention is suppressed, the announce text still goes out.
#[must_use]
pub fn mention_line(mode: PingMode, members: &[Member], pings: &[String]) -> Option<String> {
    match mode {
        PingMode::Everyone => Some(
            members
                .iter()
                .map(|m| m.nick.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        PingMode::Operators => {
            let ops: Vec<_> = members
                .iter()
                .filter(|m| m.is_operator)
                .map(|m| m.nick.as_str())
                .collect();
            if ops.is_empty() { None } else { Some(ops.join(" ")) }
        }
        PingMode::Explicit => Some(pings.join(" ")),
    }
}

/// Dispatches one announce command against the live roster.
///
/// For each resolved destination the mention line (if any) is sent with a
/// trailing colon, followed by the announce text as a second message. Send
/// failures are logged and never abort the remaining channels; the control
/// plane gets no per-channel feedback.
pub async fn dispatch<C: ChatConnection>(conn: &C, cmd: &AnnounceCommand) {
    let targets = resolve_targets(&cmd.targets, conn.joined_channels().await);
    let mode = resolve_ping_mode(&cmd.pings);

    for channel in &targets {
        let Some(members) = conn.members(channel).await else {
            tracing::warn!(channel = %channel, "announce to unknown channel, skipping");
            continue;
        };

        if let Some(line) = mention_line(mode, &members, &cmd.pings)
            && let Err(e) = conn.send_message(channel, &format!("{line}:")).await
        {
            tracing::warn!(channel = %channel, error = %e, "mention send failed");
        }

        if let Err(e) = conn.send_message(channel, &cmd.text).await {
            tracing::warn!(channel = %channel, error = %e, "announce send failed");
        }
    }
}
