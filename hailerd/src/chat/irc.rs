//! IRC-backed [`ChatConnection`] built on the `irc` crate.
//!
//! One [`IrcNetwork`] owns one IRC session. `connect` builds a fresh
//! client, registers, and waits for `RPL_WELCOME`; the session handle is
//! replaced on every reconnect. A background task keeps draining the
//! protocol stream — that both feeds the crate's channel/membership
//! tracking (which backs the roster reads) and renders every protocol
//! event into a debug log line.

use futures_util::StreamExt;
use irc::client::Client;
use irc::client::data::AccessLevel;
use irc::client::prelude::Config;
use irc::proto::{Command, Response};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::Instrument;

use super::{ChatConnection, ChatError, Member};
use crate::config::NetworkConfig;

/// A session to one configured IRC network.
pub struct IrcNetwork {
    config: NetworkConfig,
    client: Mutex<Option<Client>>,
    reader: Mutex<Option<tokio::task::JoinHandle<()>>>,
    /// Flipped to `true` by the reader task when the session dies.
    session_down: Mutex<Option<watch::Receiver<bool>>>,
}

impl IrcNetwork {
    /// Creates an unconnected session for the given network.
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
            reader: Mutex::new(None),
            session_down: Mutex::new(None),
        }
    }

    fn irc_config(&self) -> Config {
        Config {
            server: Some(self.config.hostname.clone()),
            port: Some(self.config.port),
            password: self.config.password.clone(),
            nickname: Some(self.config.nick.clone()),
            username: Some(self.config.user.clone()),
            realname: Some(self.config.realname.clone()),
            use_tls: Some(self.config.tls),
            dangerously_accept_invalid_certs: Some(self.config.tls_skip_verify),
            ..Config::default()
        }
    }
}

impl ChatConnection for IrcNetwork {
    async fn connect(&self) -> Result<(), ChatError> {
        if self.config.bind.is_some() {
            tracing::debug!("local bind address is not supported by the irc backend");
        }

        let mut client = Client::from_config(self.irc_config())
            .await
            .map_err(|e| ChatError::Connect(e.to_string()))?;
        client
            .identify()
            .map_err(|e| ChatError::Connect(e.to_string()))?;
        let mut stream = client
            .stream()
            .map_err(|e| ChatError::Connect(e.to_string()))?;

        // Registration is complete once the server sends 001.
        loop {
            match stream.next().await {
                Some(Ok(message)) => {
                    log_event(&message);
                    if matches!(message.command, Command::Response(Response::RPL_WELCOME, _)) {
                        break;
                    }
                }
                Some(Err(e)) => return Err(ChatError::Connect(e.to_string())),
                None => {
                    return Err(ChatError::Connect(
                        "connection closed during registration".to_string(),
                    ));
                }
            }
        }

        *self.client.lock() = Some(client);

        // The stream must keep being polled: it drives the crate's channel
        // and membership tracking behind the roster reads. When it ends,
        // the session is dead and `wait_disconnect` resolves.
        let (down_tx, down_rx) = watch::channel(false);
        let reader = tokio::spawn(
            async move {
                while let Some(result) = stream.next().await {
                    match result {
                        Ok(message) => log_event(&message),
                        Err(e) => {
                            tracing::warn!(error = %e, "protocol stream error");
                            break;
                        }
                    }
                }
                let _ = down_tx.send(true);
            }
            .instrument(tracing::Span::current()),
        );
        *self.session_down.lock() = Some(down_rx);
        if let Some(old) = self.reader.lock().replace(reader) {
            old.abort();
        }

        Ok(())
    }

    async fn wait_disconnect(&self) {
        let down = self.session_down.lock().clone();
        let Some(mut down) = down else { return };
        while !*down.borrow() {
            // A dropped sender means the reader is gone, so is the session.
            if down.changed().await.is_err() {
                return;
            }
        }
    }

    async fn close(&self) {
        let client = self.client.lock().take();
        if let Some(client) = client
            && let Err(e) = client.send_quit("shutting down")
        {
            tracing::debug!(error = %e, "quit on close failed");
        }

        self.session_down.lock().take();
        let reader = self.reader.lock().take();
        if let Some(handle) = reader {
            handle.abort();
        }
    }

    async fn send_message(&self, channel: &str, text: &str) -> Result<(), ChatError> {
        let stripped;
        let text = if self.config.colors {
            text
        } else {
            stripped = strip_formatting(text);
            stripped.as_str()
        };

        let guard = self.client.lock();
        let Some(client) = guard.as_ref() else {
            return Err(ChatError::NotConnected);
        };
        client
            .send_privmsg(channel, text)
            .map_err(|e| ChatError::Send(e.to_string()))
    }

    async fn joined_channels(&self) -> Vec<String> {
        let guard = self.client.lock();
        guard
            .as_ref()
            .and_then(Client::list_channels)
            .unwrap_or_default()
    }

    async fn members(&self, channel: &str) -> Option<Vec<Member>> {
        let guard = self.client.lock();
        let users = guard.as_ref()?.list_users(channel)?;
        Some(
            users
                .iter()
                .map(|u| Member {
                    nick: u.get_nickname().to_string(),
                    is_operator: u.highest_access_level() >= AccessLevel::Oper,
                })
                .collect(),
        )
    }

    async fn join(&self, channel: &str, key: Option<&str>) -> Result<(), ChatError> {
        let guard = self.client.lock();
        let Some(client) = guard.as_ref() else {
            return Err(ChatError::NotConnected);
        };

        let result = match key {
            Some(key) => client.send(Command::JOIN(
                channel.to_string(),
                Some(key.to_string()),
                None,
            )),
            None => client.send_join(channel),
        };
        result.map_err(|e| ChatError::Join(e.to_string()))
    }
}

/// Renders one protocol event as a human-readable debug log line.
fn log_event(message: &irc::proto::Message) {
    tracing::debug!("{}", message.to_string().trim_end());
}

/// Strips mIRC formatting codes (bold, color, reverse, italics,
/// underline, reset) from outbound text.
fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{02}' | '\u{0F}' | '\u{16}' | '\u{1D}' | '\u{1F}' => {}
            '\u{03}' => {
                // Color code: up to two foreground digits, then an
                // optional ",NN" background.
                let mut fg = 0;
                while fg < 2 && chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    chars.next();
                    fg += 1;
                }
                if fg > 0 && chars.peek() == Some(&',') {
                    let mut look = chars.clone();
                    look.next();
                    if look.peek().is_some_and(|c| c.is_ascii_digit()) {
                        chars.next();
                        let mut bg = 0;
                        while bg < 2 && chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                            chars.next();
                            bg += 1;
                        }
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}
