//! Loopback chat connection for testing.
//!
//! An in-process [`ChatConnection`] with a scripted roster and recorded
//! side effects. Tests clone the handle before handing it to a worker,
//! then assert on what was sent, joined, and closed.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{ChatConnection, ChatError, Member};

/// Shared state behind a cloneable [`LoopbackChat`] handle.
#[derive(Default)]
struct State {
    /// Remaining scripted connect failures before `connect` succeeds.
    connect_failures: AtomicUsize,
    /// When set, `connect` never resolves (worker must cancel it).
    hold_connects: AtomicBool,
    /// When set, `close` records the attempt but tears nothing down.
    failing_close: AtomicBool,
    close_attempts: AtomicUsize,
    connected: AtomicBool,
    closed: AtomicBool,
    /// Wakes `wait_disconnect` waiters on session state changes.
    session_events: Notify,
    /// Joined channels with their members, in roster order.
    roster: Mutex<Vec<(String, Vec<Member>)>>,
    /// Every `(channel, text)` passed to `send_message`, in order.
    sent: Mutex<Vec<(String, String)>>,
    /// Every `(channel, key)` passed to `join`, in order.
    joins: Mutex<Vec<(String, Option<String>)>>,
    /// Channels whose `join` is scripted to fail.
    failing_joins: Mutex<HashSet<String>>,
}

/// In-process chat connection with scripted behavior.
///
/// Cloning returns another handle to the same connection, so a test can
/// keep one handle for assertions while the worker owns the other.
#[derive(Clone, Default)]
pub struct LoopbackChat {
    inner: Arc<State>,
}

impl LoopbackChat {
    /// Creates a connection that connects successfully on the first attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next `n` connect attempts to fail.
    pub fn fail_connects(&self, n: usize) {
        self.inner.connect_failures.store(n, Ordering::SeqCst);
    }

    /// Makes every connect attempt hang until cancelled.
    pub fn hold_connects(&self) {
        self.inner.hold_connects.store(true, Ordering::SeqCst);
    }

    /// Scripts `join` for the given channel to fail.
    pub fn fail_join(&self, channel: &str) {
        self.inner.failing_joins.lock().insert(channel.to_string());
    }

    /// Scripts `close` to fail: attempts are counted but the session is
    /// left untouched.
    pub fn fail_close(&self) {
        self.inner.failing_close.store(true, Ordering::SeqCst);
    }

    /// Drops the established session, as if the remote end went away.
    /// A later `connect` establishes a fresh one.
    pub fn drop_session(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.session_events.notify_waiters();
    }

    /// Adds a channel with the given members to the joined roster.
    pub fn add_channel(&self, name: &str, members: Vec<Member>) {
        self.inner.roster.lock().push((name.to_string(), members));
    }

    /// Every `(channel, text)` sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.inner.sent.lock().clone()
    }

    /// Every `(channel, key)` join issued so far, in order.
    #[must_use]
    pub fn joins(&self) -> Vec<(String, Option<String>)> {
        self.inner.joins.lock().clone()
    }

    /// Whether the connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of `close` calls so far, including scripted failures.
    #[must_use]
    pub fn close_attempts(&self) -> usize {
        self.inner.close_attempts.load(Ordering::SeqCst)
    }

    /// Whether a session is currently established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}

impl ChatConnection for LoopbackChat {
    async fn connect(&self) -> Result<(), ChatError> {
        if self.inner.hold_connects.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let remaining = self.inner.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.inner
                .connect_failures
                .store(remaining - 1, Ordering::SeqCst);
            // Yield so a retry loop with no sleep cannot starve the runtime.
            tokio::task::yield_now().await;
            return Err(ChatError::Connect("scripted connect failure".to_string()));
        }

        self.inner.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_disconnect(&self) {
        loop {
            let notified = self.inner.session_events.notified();
            if !self.inner.connected.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    async fn close(&self) {
        self.inner.close_attempts.fetch_add(1, Ordering::SeqCst);
        if self.inner.failing_close.load(Ordering::SeqCst) {
            return;
        }
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.session_events.notify_waiters();
    }

    async fn send_message(&self, channel: &str, text: &str) -> Result<(), ChatError> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(ChatError::NotConnected);
        }
        self.inner
            .sent
            .lock()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn joined_channels(&self) -> Vec<String> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Vec::new();
        }
        self.inner
            .roster
            .lock()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    async fn members(&self, channel: &str) -> Option<Vec<Member>> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return None;
        }
        self.inner
            .roster
            .lock()
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, members)| members.clone())
    }

    async fn join(&self, channel: &str, key: Option<&str>) -> Result<(), ChatError> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(ChatError::NotConnected);
        }
        self.inner
            .joins
            .lock()
            .push((channel.to_string(), key.map(ToString::to_string)));

        if self.inner.failing_joins.lock().contains(channel) {
            return Err(ChatError::Join(format!("cannot join {channel}")));
        }

        let mut roster = self.inner.roster.lock();
        if !roster.iter().any(|(name, _)| name == channel) {
            roster.push((channel.to_string(), Vec::new()));
        }
        Ok(())
    }
}
