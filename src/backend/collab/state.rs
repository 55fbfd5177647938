/**
 * Room State Management
 *
 * This module manages the relay's per-room state: who is connected and the
 * merged document snapshot that late joiners are synced from.
 *
 * # Snapshot
 *
 * The relay never interprets document content. Every accepted update is
 * merged into the room's snapshot with `yrs::merge_updates_v1`, so the
 * snapshot is always a single valid update that brings an empty replica to
 * the room's current state.
 *
 * # Ordering
 *
 * Fan-out happens while the registry lock is held. A joiner therefore sees
 * its `YJS_SYNC` before any update merged after it, and every member sees
 * one peer's updates in the order they were accepted.
 */

use crate::backend::error::BackendError;
use crate::shared::protocol::{decode_payload, ServerMessage};
use crate::shared::update::check_update_v1;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;
use yrs::updates::decoder::Decode;
use yrs::{Doc, ReadTxn, StateVector, Transact, Update};

/// One connected participant
#[derive(Debug, Clone)]
pub struct Member {
    /// Connection identifier, unique per socket
    pub conn_id: Uuid,
    /// Subject of the verified token
    pub user_id: String,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Member {
    pub fn new(conn_id: Uuid, user_id: impl Into<String>, tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            conn_id,
            user_id: user_id.into(),
            tx,
        }
    }

    fn send(&self, message: ServerMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!("[Relay] Connection {} already closed", self.conn_id);
        }
    }
}

/// Members and merged snapshot of one room
#[derive(Debug)]
pub struct Room {
    members: Vec<Member>,
    snapshot: Vec<u8>,
}

impl Room {
    fn new() -> Self {
        Self {
            members: Vec::new(),
            snapshot: empty_snapshot(),
        }
    }

    fn others(&self, conn_id: Uuid) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(move |m| m.conn_id != conn_id)
    }
}

/// Encoding of an empty document
fn empty_snapshot() -> Vec<u8> {
    let doc = Doc::new();
    let txn = doc.transact();
    txn.encode_state_as_update_v1(&StateVector::default())
}

/// All rooms served by this relay
///
/// Cheap to clone; clones share the same rooms.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, Room>>>,
    capacity: usize,
}

impl RoomRegistry {
    /// Create an empty registry whose rooms hold at most `capacity` members
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add a member and send it the room's snapshot
    ///
    /// Creates the room on first join. Returns the member count after the join.
    pub async fn join(&self, room_id: &str, member: Member) -> Result<usize, BackendError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_string()).or_insert_with(Room::new);

        if room.members.len() >= self.capacity {
            tracing::warn!("[Relay] Room {} is full, rejecting {}", room_id, member.user_id);
            return Err(BackendError::RoomFull {
                room_id: room_id.to_string(),
                capacity: self.capacity,
            });
        }

        member.send(ServerMessage::sync(&room.snapshot));
        tracing::info!(
            "[Relay] {} joined room {} ({} bytes of snapshot)",
            member.user_id,
            room_id,
            room.snapshot.len()
        );
        room.members.push(member);
        Ok(room.members.len())
    }

    /// Merge an update into the room and forward it to the other members
    ///
    /// A payload that is not valid base64 or not a decodable update is
    /// rejected and leaves the room untouched.
    pub async fn apply_update(
        &self,
        room_id: &str,
        conn_id: Uuid,
        payload_b64: &str,
    ) -> Result<(), BackendError> {
        let update = decode_payload(payload_b64)?;
        check_update_v1(&update)
            .map_err(|e| BackendError::protocol(format!("payload rejected: {}", e)))?;
        Update::decode_v1(&update)
            .map_err(|e| BackendError::protocol(format!("payload is not a valid update: {}", e)))?;

        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(room_id).ok_or(BackendError::NotJoined)?;

        room.snapshot = yrs::merge_updates_v1(&[room.snapshot.as_slice(), update.as_slice()])
            .map_err(|e| BackendError::protocol(format!("failed to merge update: {}", e)))?;

        let forwarded = ServerMessage::update(&update);
        for member in room.others(conn_id) {
            member.send(forwarded.clone());
        }
        tracing::debug!(
            "[Relay] Merged {} byte update into room {}",
            update.len(),
            room_id
        );
        Ok(())
    }

    /// Echo a chat message to every member, the sender included
    pub async fn broadcast_chat(
        &self,
        room_id: &str,
        sender_id: &str,
        content: String,
        client_id: String,
    ) -> Result<(), BackendError> {
        let rooms = self.rooms.read().await;
        let room = rooms.get(room_id).ok_or(BackendError::NotJoined)?;

        let message = ServerMessage::PartnerChat {
            content,
            sender_id: sender_id.to_string(),
            sent_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            client_id: Some(client_id),
        };
        for member in &room.members {
            member.send(message.clone());
        }
        Ok(())
    }

    /// Remove a member, notify the rest and drop the room once empty
    ///
    /// Returns whether the connection was a member.
    pub async fn leave(&self, room_id: &str, conn_id: Uuid) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return false;
        };

        let before = room.members.len();
        room.members.retain(|m| m.conn_id != conn_id);
        if room.members.len() == before {
            return false;
        }

        for member in &room.members {
            member.send(ServerMessage::Left {
                room_id: Some(room_id.to_string()),
            });
        }
        if room.members.is_empty() {
            rooms.remove(room_id);
            tracing::info!("[Relay] Room {} closed", room_id);
        }
        true
    }

    /// Number of members in a room
    pub async fn member_count(&self, room_id: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map(|r| r.members.len())
            .unwrap_or(0)
    }

    /// Number of open rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Current merged snapshot of a room
    pub async fn snapshot(&self, room_id: &str) -> Option<Vec<u8>> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map(|r| r.snapshot.clone())
    }
}
