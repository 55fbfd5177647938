//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - An in-memory relay transport
//! - An in-memory room that merges updates like the relay does
//! - Helpers to bring a client to the synced state
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use xfcollab::client::{RelayTransport, SyncController, TextBuffer, TransportError, TransportEvent};
use xfcollab::shared::protocol::{decode_payload, encode_payload};
use xfcollab::shared::{ClientMessage, Language, ServerMessage};
use yrs::{Doc, ReadTxn, StateVector, Transact};

/// Transport that records what it is asked to send
///
/// Clones share the same outbox, so a test can keep one handle while the
/// controller owns another.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    outbox: Rc<RefCell<Vec<ClientMessage>>>,
    open: Rc<Cell<bool>>,
}

impl MemoryTransport {
    pub fn open() -> Self {
        let transport = Self::default();
        transport.open.set(true);
        transport
    }

    pub fn closed() -> Self {
        Self::default()
    }

    /// Drain everything sent so far
    pub fn take_sent(&self) -> Vec<ClientMessage> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }

    /// Number of messages waiting in the outbox
    pub fn pending(&self) -> usize {
        self.outbox.borrow().len()
    }
}

impl RelayTransport for MemoryTransport {
    fn is_open(&self) -> bool {
        self.open.get()
    }

    fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        if !self.open.get() {
            return Err(TransportError::NotOpen);
        }
        self.outbox.borrow_mut().push(message);
        Ok(())
    }

    fn close(&mut self) {
        self.open.set(false);
    }
}

pub type Client = SyncController<MemoryTransport, TextBuffer>;

/// Client whose transport is open and whose join has been sent
pub fn joined_client(room_id: &str, language: Language) -> (Client, MemoryTransport) {
    let transport = MemoryTransport::open();
    let mut client = SyncController::new(transport.clone(), TextBuffer::new(), room_id, language);
    client.dispatch(TransportEvent::Opened);
    assert_eq!(
        transport.take_sent(),
        vec![ClientMessage::JoinRoom {
            room_id: room_id.to_string()
        }]
    );
    (client, transport)
}

/// Room state kept the way the relay keeps it
pub struct MemoryRoom {
    snapshot: Vec<u8>,
}

impl Default for MemoryRoom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRoom {
    pub fn new() -> Self {
        let doc = Doc::new();
        let txn = doc.transact();
        let snapshot = txn.encode_state_as_update_v1(&StateVector::default());
        Self { snapshot }
    }

    /// `YJS_SYNC` for a joiner
    pub fn sync_event(&self) -> TransportEvent {
        TransportEvent::Message(ServerMessage::sync(&self.snapshot))
    }

    /// Merge an update into the room snapshot
    pub fn accept(&mut self, update: &[u8]) {
        self.snapshot = yrs::merge_updates_v1(&[self.snapshot.as_slice(), update])
            .expect("update merges into snapshot");
    }

    /// Take every update `from` has sent, merge it, and return the frames
    /// the relay would forward to the other member
    pub fn collect(&mut self, from: &MemoryTransport) -> Vec<TransportEvent> {
        let mut forwarded = Vec::new();
        for message in from.take_sent() {
            if let ClientMessage::YjsUpdate { payload_b64 } = message {
                let update = decode_payload(&payload_b64).expect("client sends valid base64");
                self.accept(&update);
                forwarded.push(TransportEvent::Message(ServerMessage::YjsUpdate {
                    payload_b64: encode_payload(&update),
                }));
            }
        }
        forwarded
    }

    /// Forward `from`'s outbox to `to`; returns how many updates moved
    pub fn relay(&mut self, from: &MemoryTransport, to: &mut Client) -> usize {
        let events = self.collect(from);
        let count = events.len();
        for event in events {
            to.dispatch(event);
        }
        count
    }
}

/// Two clients in one room, both synced; `a` joined first and seeded the template
pub fn synced_pair(language: Language) -> (Client, MemoryTransport, Client, MemoryTransport, MemoryRoom) {
    let mut room = MemoryRoom::new();

    let (mut a, a_tx) = joined_client("room-1", language);
    a.dispatch(room.sync_event());
    room.collect(&a_tx);

    let (mut b, b_tx) = joined_client("room-1", language);
    b.dispatch(room.sync_event());
    assert_eq!(b_tx.pending(), 0, "late joiner must not reseed the template");

    (a, a_tx, b, b_tx, room)
}
