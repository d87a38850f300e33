// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::needless_continue,
    clippy::match_same_arms,
    clippy::doc_markdown,
    clippy::manual_let_else,
    clippy::future_not_send,
    clippy::redundant_pub_crate,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::missing_docs_in_private_items
)]

//! Whole-daemon tests: startup validation, announce flow through the
//! control socket, and the shutdown barrier.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio_tungstenite::tungstenite::Message;

use hailer_proto::command::AnnounceCommand;
use hailer_proto::control::{self, ControlMessage};
use hailerd::chat::Member;
use hailerd::chat::loopback::LoopbackChat;
use hailerd::config::{DaemonConfig, NetworkConfig};
use hailerd::supervisor::{self, DaemonError};

fn net(id: &str) -> NetworkConfig {
    NetworkConfig {
        id: id.to_string(),
        hostname: "irc.test.example".to_string(),
        port: 6667,
        password: None,
        bind: None,
        tls: false,
        tls_skip_verify: false,
        nick: "hailer".to_string(),
        user: "hailer".to_string(),
        realname: "hailer".to_string(),
        colors: true,
        channels: Vec::new(),
    }
}

fn daemon_config(networks: Vec<NetworkConfig>) -> DaemonConfig {
    DaemonConfig {
        control_addr: "127.0.0.1:0".to_string(),
        log_level: "info".to_string(),
        networks,
    }
}

/// Connector that keeps a handle to every connection it hands out, keyed
/// by network id.
#[derive(Clone, Default)]
struct TrackingConnector {
    chats: Arc<Mutex<Vec<(String, LoopbackChat)>>>,
}

impl TrackingConnector {
    fn connect(&self, config: &NetworkConfig) -> LoopbackChat {
        let chat = LoopbackChat::new();
        self.chats.lock().push((config.id.clone(), chat.clone()));
        chat
    }

    fn get(&self, id: &str) -> LoopbackChat {
        self.chats
            .lock()
            .iter()
            .find(|(chat_id, _)| chat_id == id)
            .map(|(_, chat)| chat.clone())
            .unwrap()
    }

    fn all(&self) -> Vec<LoopbackChat> {
        self.chats
            .lock()
            .iter()
            .map(|(_, chat)| chat.clone())
            .collect()
    }
}

/// Polls `condition` until it holds, panicking after two seconds.
async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting until {what}");
}

#[tokio::test]
async fn startup_refuses_empty_network_id() {
    let config = daemon_config(vec![net("")]);
    let result = supervisor::spawn(&config, |_| LoopbackChat::new()).await;
    assert!(matches!(result, Err(DaemonError::EmptyNetworkId)));
}

#[tokio::test]
async fn startup_refuses_duplicate_network_id() {
    let config = daemon_config(vec![net("alpha"), net("alpha")]);
    let result = supervisor::spawn(&config, |_| LoopbackChat::new()).await;
    assert!(matches!(
        result,
        Err(DaemonError::DuplicateNetworkId(id)) if id == "alpha"
    ));
}

#[tokio::test]
async fn announce_flows_from_control_socket_to_network() {
    let connector = TrackingConnector::default();
    let config = daemon_config(vec![net("alpha"), net("beta")]);

    let c = connector.clone();
    let handle = supervisor::spawn(&config, move |n| c.connect(n)).await.unwrap();

    let alpha = connector.get("alpha");
    alpha.add_channel("#ops", vec![Member::operator("bob")]);
    wait_until("alpha connects", || alpha.is_connected()).await;

    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("ws://{}/control", handle.control_addr))
            .await
            .unwrap();
    let request = ControlMessage::Announce {
        network: "alpha".to_string(),
        command: AnnounceCommand::new(["@"], ["#ops"], "deploy starting"),
    };
    ws.send(Message::Binary(control::encode(&request).unwrap().into()))
        .await
        .unwrap();

    let reply = loop {
        if let Message::Binary(data) = ws.next().await.unwrap().unwrap() {
            break control::decode(&data).unwrap();
        }
    };
    assert_eq!(reply, ControlMessage::Ack);

    wait_until("alpha delivers the announce", || alpha.sent().len() == 2).await;
    assert_eq!(
        alpha.sent(),
        vec![
            ("#ops".to_string(), "bob:".to_string()),
            ("#ops".to_string(), "deploy starting".to_string()),
        ]
    );
    // The other network is untouched.
    assert!(connector.get("beta").sent().is_empty());

    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_every_connection_before_returning() {
    let connector = TrackingConnector::default();
    let config = daemon_config(vec![net("alpha"), net("beta"), net("gamma")]);

    let c = connector.clone();
    let handle = supervisor::spawn(&config, move |n| c.connect(n)).await.unwrap();
    wait_until("all networks connect", || {
        let chats = connector.all();
        chats.len() == 3 && chats.iter().all(LoopbackChat::is_connected)
    })
    .await;

    handle.shutdown().await;

    for chat in connector.all() {
        assert!(chat.is_closed());
    }
}

#[tokio::test]
async fn control_shutdown_request_reaches_the_supervisor() {
    let connector = TrackingConnector::default();
    let config = daemon_config(vec![net("alpha")]);

    let c = connector.clone();
    let mut handle = supervisor::spawn(&config, move |n| c.connect(n)).await.unwrap();

    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("ws://{}/control", handle.control_addr))
            .await
            .unwrap();
    ws.send(Message::Binary(
        control::encode(&ControlMessage::Shutdown).unwrap().into(),
    ))
    .await
    .unwrap();

    handle.stop_requested().await;
    handle.shutdown().await;
    assert!(connector.get("alpha").is_closed());
}
