//! Chat network abstraction for the hailer daemon.
//!
//! Defines the [`ChatConnection`] trait that the per-network worker drives.
//! Concrete implementations include:
//! - [`loopback::LoopbackChat`] — in-process scripted connection for testing
//! - [`irc::IrcNetwork`] — real IRC session via the `irc` crate
//!
//! The trait covers exactly what the worker needs: a retryable connect, a
//! close, outbound sends, channel joins, and read access to the live roster
//! (joined channels, per-channel members with operator flags). Protocol
//! semantics — registration, framing, TLS, membership tracking — live
//! entirely inside the implementation.

pub mod irc;
pub mod loopback;

/// One member of a channel as reported by the live roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// The member's nickname.
    pub nick: String,
    /// Whether the member is flagged as a channel operator.
    pub is_operator: bool,
}

impl Member {
    /// Creates a regular (non-operator) member.
    #[must_use]
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            is_operator: false,
        }
    }

    /// Creates a member flagged as channel operator.
    #[must_use]
    pub fn operator(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            is_operator: true,
        }
    }
}

/// Errors that can occur during chat connection operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// No session is established yet (or it has been torn down).
    #[error("not connected")]
    NotConnected,

    /// Establishing a session failed; the caller may retry.
    #[error("connect failed: {0}")]
    Connect(String),

    /// An outbound send was not accepted by the session.
    #[error("send failed: {0}")]
    Send(String),

    /// A channel join was not accepted by the session.
    #[error("join failed: {0}")]
    Join(String),
}

/// Async trait for one owned session to a remote chat network.
///
/// Each connection is owned exclusively by its network worker: no other
/// component reads or mutates it, so implementations only need interior
/// mutability for their own bookkeeping.
///
/// # Contract
///
/// [`ChatConnection::connect`] returns once a session is fully established
/// (registration complete); it is retryable after an error, and callable
/// again after an established session drops — a fresh session replaces the
/// dead one. Roster reads return empty/`None` while disconnected, and sends
/// fail with [`ChatError::NotConnected`] — commands handled before the
/// first successful connect are dropped, not buffered.
pub trait ChatConnection: Send + Sync + 'static {
    /// Establish a session with the remote network.
    fn connect(&self) -> impl std::future::Future<Output = Result<(), ChatError>> + Send;

    /// Resolves once the current session has been lost. Pending while the
    /// session is healthy; resolves immediately when no session exists.
    fn wait_disconnect(&self) -> impl std::future::Future<Output = ()> + Send;

    /// Tear down the session. Idempotent; errors are the implementation's
    /// to log, the worker always converges to closed.
    fn close(&self) -> impl std::future::Future<Output = ()> + Send;

    /// Send one message to a channel.
    fn send_message(
        &self,
        channel: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), ChatError>> + Send;

    /// Channels the session currently has joined, in roster order.
    fn joined_channels(&self) -> impl std::future::Future<Output = Vec<String>> + Send;

    /// Current members of a joined channel, or `None` if the channel is
    /// not in the roster.
    fn members(&self, channel: &str)
    -> impl std::future::Future<Output = Option<Vec<Member>>> + Send;

    /// Join a channel, optionally with a join key.
    fn join(
        &self,
        channel: &str,
        key: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), ChatError>> + Send;
}
