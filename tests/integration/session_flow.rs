//! Integration tests for the join, sync and edit flow between two clients

use crate::common::{joined_client, synced_pair, MemoryRoom, MemoryTransport};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::sync::mpsc;
use xfcollab::client::services::ServiceClient;
use xfcollab::client::{
    ChatReconciler, CollabSession, EditorSurface, SessionCommand, SessionEvent, SyncController,
    SyncStatus, TextBuffer, TransportEvent,
};
use xfcollab::shared::{ChatRole, ClientMessage, EditOp, Language, ServerMessage};

#[test]
fn test_late_joiner_widget_overwritten_without_echo() {
    let mut room = MemoryRoom::new();

    // B is alone in the room and has replaced the template with its code.
    let (mut b, b_tx) = joined_client("room-1", Language::Python);
    b.dispatch(room.sync_event());
    let template_len = b.surface().value().encode_utf16().count();
    b.surface_mut()
        .apply_user_edit(vec![EditOp::replace(0, template_len, "def f(): pass")]);
    b.pump_surface();
    room.collect(&b_tx);

    let (mut a, a_tx) = joined_client("room-1", Language::Python);
    assert_eq!(a.surface().value(), "");
    a.dispatch(room.sync_event());
    a.pump_surface();

    assert_eq!(a.status(), &SyncStatus::Synced);
    assert_eq!(a.surface().value(), "def f(): pass");
    assert_eq!(a.document().content(), "def f(): pass");
    assert_eq!(a_tx.pending(), 0);
    assert_eq!(a.updates_sent(), 0);
}

#[test]
fn test_one_edit_one_update_no_amplification() {
    let (mut a, a_tx, mut b, b_tx, mut room) = synced_pair(Language::JavaScript);

    a.surface_mut().type_at(0, "// pair\n");
    a.pump_surface();
    assert_eq!(a_tx.pending(), 1);

    assert_eq!(room.relay(&a_tx, &mut b), 1);
    b.pump_surface();
    assert_eq!(b_tx.pending(), 0, "applying a remote update must not send");
    assert_eq!(b.surface().value(), a.surface().value());
    assert!(b.surface().value().starts_with("// pair\n"));
}

#[test]
fn test_concurrent_edits_converge_through_relay() {
    let (mut a, a_tx, mut b, b_tx, mut room) = synced_pair(Language::Python);

    a.surface_mut().type_at(0, "# alice\n");
    a.pump_surface();
    b.surface_mut().append("# bob\n");
    b.pump_surface();

    let to_b = room.collect(&a_tx);
    let to_a = room.collect(&b_tx);
    for event in to_b {
        b.dispatch(event);
    }
    for event in to_a {
        a.dispatch(event);
    }
    a.pump_surface();
    b.pump_surface();

    let content = a.document().content();
    assert_eq!(b.document().content(), content);
    assert_eq!(a.surface().value(), content);
    assert_eq!(b.surface().value(), content);
    assert!(content.starts_with("# alice\n"));
    assert!(content.ends_with("# bob\n"));
    assert_eq!(a_tx.pending() + b_tx.pending(), 0);
}

#[test]
fn test_multi_region_edit_is_one_transaction() {
    let (mut a, a_tx, mut b, _b_tx, mut room) = synced_pair(Language::Python);
    let before = a.surface().value();

    a.surface_mut()
        .apply_user_edit(vec![EditOp::insert(0, "# top\n"), EditOp::insert(4, "X")]);
    a.pump_surface();
    assert_eq!(a_tx.pending(), 1);

    room.relay(&a_tx, &mut b);
    assert_eq!(b.surface().value(), a.surface().value());
    assert_ne!(a.surface().value(), before);
}

#[test]
fn test_edits_before_sync_reach_the_partner() {
    let mut room = MemoryRoom::new();
    let (mut a, a_tx) = joined_client("room-1", Language::Python);
    a.dispatch(room.sync_event());
    room.collect(&a_tx);

    let (mut b, b_tx) = joined_client("room-1", Language::Python);
    b.surface_mut().type_at(0, "early ");
    b.pump_surface();
    assert_eq!(b_tx.pending(), 0, "nothing is broadcast before the snapshot");

    b.dispatch(room.sync_event());
    assert_eq!(b_tx.pending(), 1);
    room.relay(&b_tx, &mut a);

    assert_eq!(a.document().content(), b.document().content());
    assert!(a.document().content().contains("early "));
}

#[test]
fn test_peer_left_keeps_sync_status() {
    let (mut a, _a_tx, _b, _b_tx, _room) = synced_pair(Language::Python);
    a.dispatch(TransportEvent::Message(ServerMessage::Left {
        room_id: Some("room-1".to_string()),
    }));
    assert!(a.peer_left());
    assert_eq!(a.status(), &SyncStatus::Synced);

    a.surface_mut().append("solo\n");
    a.pump_surface();
    assert!(a.document().content().ends_with("solo\n"));
}

fn session(
    identity: &str,
    transport: MemoryTransport,
) -> (
    CollabSession<MemoryTransport>,
    mpsc::UnboundedReceiver<SessionEvent>,
) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let controller = SyncController::new(transport, TextBuffer::new(), "room-1", Language::Python);
    let chat = ChatReconciler::new(Some(identity.to_string()), Duration::from_secs(8));
    let services = ServiceClient::new(None, None);
    (
        CollabSession::new(controller, chat, services, events_tx),
        events_rx,
    )
}

#[test]
fn test_partner_chat_round_trip_between_sessions() {
    let a_tx = MemoryTransport::open();
    let b_tx = MemoryTransport::open();
    let (mut a, mut a_events) = session("alice", a_tx.clone());
    let (mut b, _b_events) = session("bob", b_tx.clone());

    a.handle_command(SessionCommand::Chat("@partner check case 3".to_string()));
    let sent = a_tx.take_sent();
    let (content, client_id) = match sent.as_slice() {
        [ClientMessage::PartnerChat { content, client_id }] => (content.clone(), client_id.clone()),
        other => panic!("expected one PARTNER_CHAT, got {:?}", other),
    };
    assert_eq!(content, "check case 3");
    assert_eq!(a.chat().pending_count(), 1);

    let echo = ServerMessage::PartnerChat {
        content,
        sender_id: "alice".to_string(),
        sent_at: "2026-01-01T00:00:00Z".to_string(),
        client_id: Some(client_id),
    };
    a.handle_transport(TransportEvent::Message(echo.clone()));
    b.handle_transport(TransportEvent::Message(echo));

    assert_eq!(a.chat().entries().len(), 1);
    assert!(a.chat().entries()[0].delivered);
    assert_eq!(a.chat().pending_count(), 0);
    assert_eq!(a_events.try_recv().unwrap(), SessionEvent::ChatDelivered(0));

    assert_eq!(b.chat().entries().len(), 1);
    assert_eq!(b.chat().entries()[0].role, ChatRole::Peer);
    assert_eq!(
        b.chat().notice().map(|n| n.content.as_str()),
        Some("check case 3")
    );
}

#[test]
fn test_chat_hints_and_missing_question() {
    let (mut a, _events) = session("alice", MemoryTransport::open());

    a.handle_command(SessionCommand::Chat("@partner".to_string()));
    a.handle_command(SessionCommand::Run);

    let contents: Vec<&str> = a
        .chat()
        .entries()
        .iter()
        .map(|e| e.content.as_str())
        .collect();
    assert_eq!(
        contents,
        vec![
            "Type a message after @partner to send it to your partner.",
            "No test cases available",
        ]
    );
}

#[test]
fn test_partner_chat_while_disconnected() {
    let (mut a, _events) = session("alice", MemoryTransport::closed());
    a.handle_command(SessionCommand::Chat("@partner hello".to_string()));

    assert_eq!(a.chat().entries().len(), 1);
    assert_eq!(a.chat().entries()[0].role, ChatRole::System);
    assert_eq!(a.chat().pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_session_loop_shows_and_expires_notice() {
    let (b, mut events) = session("bob", MemoryTransport::open());
    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    let driver = async move {
        transport_tx
            .send(TransportEvent::Message(ServerMessage::PartnerChat {
                content: "check case 3".to_string(),
                sender_id: "alice".to_string(),
                sent_at: "2026-01-01T00:00:00Z".to_string(),
                client_id: Some("c1".to_string()),
            }))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen
            .iter()
            .any(|e| matches!(e, SessionEvent::Notice(Some(n)) if n.content == "check case 3")));
        assert!(!seen.contains(&SessionEvent::Notice(None)));

        tokio::time::sleep(Duration::from_secs(8)).await;
        let mut later = Vec::new();
        while let Ok(event) = events.try_recv() {
            later.push(event);
        }
        assert!(later.contains(&SessionEvent::Notice(None)));

        commands_tx.send(SessionCommand::Quit).unwrap();
    };

    tokio::join!(b.run(transport_rx, commands_rx), driver);
}

#[tokio::test(start_paused = true)]
async fn test_session_loop_publishes_sync() {
    let transport = MemoryTransport::open();
    let (a, mut events) = session("alice", transport.clone());
    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let room = MemoryRoom::new();

    let driver = async move {
        transport_tx.send(TransportEvent::Opened).unwrap();
        transport_tx.send(room.sync_event()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        commands_tx
            .send(SessionCommand::Append("print(1)\n".to_string()))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        commands_tx.send(SessionCommand::Quit).unwrap();
    };
    tokio::join!(a.run(transport_rx, commands_rx), driver);

    let mut statuses = Vec::new();
    let mut last_document = None;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Status(status) => statuses.push(status),
            SessionEvent::Document(content) => last_document = Some(content),
            _ => {}
        }
    }
    assert_eq!(
        statuses,
        vec![
            SyncStatus::Connecting,
            SyncStatus::Joined,
            SyncStatus::Synced,
            SyncStatus::Disconnected
        ]
    );
    let content = last_document.unwrap();
    assert!(content.starts_with(Language::Python.template()));
    assert!(content.ends_with("print(1)\n"));

    let sent = transport.take_sent();
    assert!(matches!(sent.first(), Some(ClientMessage::JoinRoom { .. })));
    assert_eq!(sent.last(), Some(&ClientMessage::LeaveRoom));
    let updates = sent
        .iter()
        .filter(|m| matches!(m, ClientMessage::YjsUpdate { .. }))
        .count();
    assert_eq!(updates, 2, "template seed and the appended line");
}
