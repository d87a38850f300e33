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

//! End-to-end dispatch scenarios against a scripted roster.
//!
//! Covers the resolution policy: wildcard targets resolve against the
//! live joined-channel list, ping-mode priority, operator-only mentions
//! with silent suppression, unknown-channel skips, and the two-message
//! mention-then-text shape.

use hailer_proto::command::AnnounceCommand;
use hailerd::chat::loopback::LoopbackChat;
use hailerd::chat::{ChatConnection, Member};
use hailerd::dispatch;

/// Roster from the reference scenario: #ops with alice and bob, bob an op.
async fn ops_roster() -> LoopbackChat {
    let chat = LoopbackChat::new();
    chat.add_channel("#ops", vec![Member::new("alice"), Member::operator("bob")]);
    chat.connect().await.unwrap();
    chat
}

#[tokio::test]
async fn operator_ping_sends_mention_then_text() {
    let chat = ops_roster().await;
    let cmd = AnnounceCommand::new(["@"], ["#ops"], "deploy starting");

    dispatch::dispatch(&chat, &cmd).await;

    assert_eq!(
        chat.sent(),
        vec![
            ("#ops".to_string(), "bob:".to_string()),
            ("#ops".to_string(), "deploy starting".to_string()),
        ]
    );
}

#[tokio::test]
async fn everyone_wildcard_reaches_every_joined_channel() {
    let chat = ops_roster().await;
    chat.add_channel("#dev", vec![Member::new("carol")]);

    let cmd = AnnounceCommand::new(["*"], ["*"], "hi");
    dispatch::dispatch(&chat, &cmd).await;

    assert_eq!(
        chat.sent(),
        vec![
            ("#ops".to_string(), "alice bob:".to_string()),
            ("#ops".to_string(), "hi".to_string()),
            ("#dev".to_string(), "carol:".to_string()),
            ("#dev".to_string(), "hi".to_string()),
        ]
    );
}

#[tokio::test]
async fn everyone_wildcard_wins_regardless_of_other_entries() {
    let chat = ops_roster().await;
    let cmd = AnnounceCommand::new(["bob", "*"], ["#ops"], "hi");

    dispatch::dispatch(&chat, &cmd).await;

    // Mention is the full member list, not the literal "bob".
    assert_eq!(chat.sent()[0].1, "alice bob:");
}

#[tokio::test]
async fn unknown_channel_skipped_but_others_processed() {
    let chat = ops_roster().await;
    let cmd = AnnounceCommand::new(["@"], ["#unknown", "#ops"], "deploy starting");

    dispatch::dispatch(&chat, &cmd).await;

    // Zero messages for #unknown; #ops still gets both messages.
    assert_eq!(
        chat.sent(),
        vec![
            ("#ops".to_string(), "bob:".to_string()),
            ("#ops".to_string(), "deploy starting".to_string()),
        ]
    );
}

#[tokio::test]
async fn empty_operator_set_still_sends_text() {
    let chat = LoopbackChat::new();
    chat.add_channel("#dev", vec![Member::new("carol"), Member::new("dave")]);
    chat.connect().await.unwrap();

    let cmd = AnnounceCommand::new(["@"], ["#dev"], "heads up");
    dispatch::dispatch(&chat, &cmd).await;

    // No mention line, only the announce text.
    assert_eq!(chat.sent(), vec![("#dev".to_string(), "heads up".to_string())]);
}

#[tokio::test]
async fn explicit_pings_used_verbatim() {
    let chat = ops_roster().await;
    let cmd = AnnounceCommand::new(["dave", "erin"], ["#ops"], "review please");

    dispatch::dispatch(&chat, &cmd).await;

    // Mentioned names need not be actual members.
    assert_eq!(chat.sent()[0].1, "dave erin:");
}

#[tokio::test]
async fn wildcard_targets_resolve_at_dispatch_time() {
    let chat = ops_roster().await;

    let cmd = AnnounceCommand::new(["@"], ["*"], "first");
    dispatch::dispatch(&chat, &cmd).await;

    chat.add_channel("#late", vec![Member::operator("erin")]);
    let cmd = AnnounceCommand::new(["@"], ["*"], "second");
    dispatch::dispatch(&chat, &cmd).await;

    let late_messages: Vec<_> = chat
        .sent()
        .into_iter()
        .filter(|(chan, _)| chan == "#late")
        .collect();
    assert_eq!(
        late_messages,
        vec![
            ("#late".to_string(), "erin:".to_string()),
            ("#late".to_string(), "second".to_string()),
        ]
    );
}
