//! Property-based tests for partner chat deduplication

use crate::common::MemoryTransport;
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use xfcollab::client::chat::ChatReceipt;
use xfcollab::client::ChatReconciler;
use xfcollab::shared::{ChatRole, ClientMessage};

fn sent_ids(transport: &MemoryTransport) -> Vec<(String, String)> {
    transport
        .take_sent()
        .into_iter()
        .filter_map(|message| match message {
            ClientMessage::PartnerChat { content, client_id } => Some((content, client_id)),
            _ => None,
        })
        .collect()
}

fn echo(chat: &mut ChatReconciler, content: &str, client_id: &str) -> ChatReceipt {
    chat.receive_partner(
        content.to_string(),
        "alice".to_string(),
        "2026-01-01T00:00:00Z".to_string(),
        Some(client_id.to_string()),
        Instant::now(),
    )
}

proptest! {
    #[test]
    fn test_echoes_in_any_order_confirm_each_once(
        order in (1usize..10).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle()),
        duplicates in prop::collection::vec(any::<bool>(), 10),
    ) {
        let n = order.len();
        let transport = MemoryTransport::open();
        let mut chat = ChatReconciler::new(Some("alice".to_string()), Duration::from_secs(8));

        for i in 0..n {
            chat.send_partner(&format!("message {}", i), &transport).unwrap();
        }
        let sent = sent_ids(&transport);
        prop_assert_eq!(sent.len(), n);
        prop_assert_eq!(chat.pending_count(), n);

        let mut confirmed = HashSet::new();
        for (position, &i) in order.iter().enumerate() {
            let (content, client_id) = &sent[i];
            let receipt = echo(&mut chat, content, client_id);
            prop_assert_eq!(receipt, ChatReceipt::Confirmed(i));
            prop_assert!(confirmed.insert(i));

            if duplicates[position] {
                let again = echo(&mut chat, content, client_id);
                prop_assert_eq!(again, ChatReceipt::Refreshed(i));
            }
        }

        prop_assert_eq!(chat.entries().len(), n);
        prop_assert_eq!(chat.pending_count(), 0);
        prop_assert!(chat.entries().iter().all(|e| e.delivered && e.role == ChatRole::SelfAuthored));
        prop_assert!(chat.notice().is_none());
    }

    #[test]
    fn test_unknown_identity_treats_everything_as_peer(
        count in 1usize..6,
    ) {
        let mut chat = ChatReconciler::new(None, Duration::from_secs(8));
        for i in 0..count {
            let receipt = chat.receive_partner(
                format!("message {}", i),
                "alice".to_string(),
                String::new(),
                Some(format!("c{}", i)),
                Instant::now(),
            );
            prop_assert_eq!(receipt, ChatReceipt::Peer(i));
        }
        prop_assert!(chat.entries().iter().all(|e| e.role == ChatRole::Peer));
        prop_assert!(chat.notice().is_some());
    }
}

#[test]
fn test_self_echo_without_pending_entry_is_appended_once() {
    let mut chat = ChatReconciler::new(Some("alice".to_string()), Duration::from_secs(8));

    assert_eq!(echo(&mut chat, "from another tab", "c9"), ChatReceipt::SelfAppended(0));
    assert_eq!(echo(&mut chat, "from another tab", "c9"), ChatReceipt::Refreshed(0));
    assert_eq!(chat.entries().len(), 1);
    assert!(chat.notice().is_none());
}

#[test]
fn test_peer_messages_interleaved_with_echoes() {
    let transport = MemoryTransport::open();
    let mut chat = ChatReconciler::new(Some("alice".to_string()), Duration::from_secs(8));

    chat.send_partner("first", &transport).unwrap();
    let sent = sent_ids(&transport);

    let peer = chat.receive_partner(
        "reply".to_string(),
        "bob".to_string(),
        String::new(),
        Some("b1".to_string()),
        Instant::now(),
    );
    assert_eq!(peer, ChatReceipt::Peer(1));
    assert_eq!(echo(&mut chat, &sent[0].0, &sent[0].1), ChatReceipt::Confirmed(0));

    let roles: Vec<ChatRole> = chat.entries().iter().map(|e| e.role).collect();
    assert_eq!(roles, vec![ChatRole::SelfAuthored, ChatRole::Peer]);
    assert_eq!(chat.notice().map(|n| n.content.as_str()), Some("reply"));
}
