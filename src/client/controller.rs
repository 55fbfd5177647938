/**
 * Sync Controller
 *
 * Drives one session's replicated document through the relay lifecycle:
 *
 * ```text
 * Connecting ──open──▶ Joined ──YJS_SYNC──▶ Synced
 *      │                  │                   │
 *      └──────────────────┴───── close ───────┴──▶ Disconnected
 *                         ERROR (any state) ─────▶ Error
 * ```
 *
 * Until the first snapshot arrives the document is not trusted: local edits
 * are kept in the document but not broadcast. Once the snapshot is merged,
 * the surface is reconciled to the document (the document wins), anything
 * typed before the join is flushed as one update, and an empty buffer is
 * seeded with the language template.
 *
 * Every document transaction is routed through one check on the echo guard:
 * it reaches the surface unless it came from the surface, and reaches the
 * relay unless it came from the relay.
 */
use crate::client::adapter::{EchoGuard, SurfaceAdapter};
use crate::client::document::{CodeDocument, DocumentChange};
use crate::client::surface::EditorSurface;
use crate::client::transport::{RelayTransport, TransportEvent};
use crate::shared::language::Language;
use crate::shared::protocol::{decode_payload, ClientMessage, ServerMessage};
use std::fmt;
use std::rc::Rc;

/// Connection and sync state shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// A required connection parameter is missing
    Blocked(String),
    Connecting,
    /// Joined the room, snapshot pending
    Joined,
    Synced,
    /// Relay-reported error; the connection stays open
    Error(String),
    Disconnected,
}

impl SyncStatus {
    /// Status for a session that cannot connect
    pub fn blocked(missing: &[&str]) -> Self {
        SyncStatus::Blocked(missing.join(", "))
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Blocked(missing) => write!(f, "missing session details: {}", missing),
            SyncStatus::Connecting => f.write_str("connecting…"),
            SyncStatus::Joined => f.write_str("connected"),
            SyncStatus::Synced => f.write_str("synced"),
            SyncStatus::Error(message) => write!(f, "error: {}", message),
            SyncStatus::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Partner chat delivered by the relay, handed to the chat reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingChat {
    pub content: String,
    pub sender_id: String,
    pub sent_at: String,
    pub client_id: Option<String>,
}

/// Replicated document, surface and relay connection of one session
pub struct SyncController<T, S> {
    document: CodeDocument,
    adapter: SurfaceAdapter<S>,
    guard: Rc<EchoGuard>,
    transport: T,
    room_id: String,
    language: Language,
    status: SyncStatus,
    synced: bool,
    peer_left: bool,
    updates_sent: usize,
}

impl<T: RelayTransport, S: EditorSurface> SyncController<T, S> {
    /// Create a controller waiting for its transport to open
    ///
    /// # Arguments
    /// * `transport` - Connection to the relay
    /// * `surface` - Editing surface mirrored from the document
    /// * `room_id` - Room joined once the transport opens
    /// * `language` - Language whose template seeds an empty buffer
    pub fn new(transport: T, surface: S, room_id: impl Into<String>, language: Language) -> Self {
        let guard = Rc::new(EchoGuard::new());
        Self {
            document: CodeDocument::new(),
            adapter: SurfaceAdapter::new(surface, Rc::clone(&guard)),
            guard,
            transport,
            room_id: room_id.into(),
            language,
            status: SyncStatus::Connecting,
            synced: false,
            peer_left: false,
            updates_sent: 0,
        }
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    /// Mark the session as unable to connect
    pub fn block(&mut self, missing: &[&str]) {
        self.status = SyncStatus::blocked(missing);
        tracing::warn!("[Sync] Session blocked: {}", self.status);
    }

    pub fn document(&self) -> &CodeDocument {
        &self.document
    }

    pub fn surface(&self) -> &S {
        self.adapter.surface()
    }

    pub fn surface_mut(&mut self) -> &mut S {
        self.adapter.surface_mut()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Whether the partner has left since the flag was last cleared
    pub fn peer_left(&self) -> bool {
        self.peer_left
    }

    pub fn clear_peer_left(&mut self) {
        self.peer_left = false;
    }

    /// Number of `YJS_UPDATE` messages sent so far
    pub fn updates_sent(&self) -> usize {
        self.updates_sent
    }

    /// Route one transport event
    ///
    /// Returns partner chat for the chat reconciler; everything else is
    /// handled here.
    pub fn dispatch(&mut self, event: TransportEvent) -> Option<IncomingChat> {
        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Closed { reason } => self.on_closed(&reason),
            TransportEvent::Message(message) => return self.on_message(message),
        }
        None
    }

    fn on_message(&mut self, message: ServerMessage) -> Option<IncomingChat> {
        match message {
            ServerMessage::YjsSync { payload_b64 } => match decode_payload(&payload_b64) {
                Ok(bytes) => self.on_snapshot(&bytes),
                Err(e) => tracing::warn!("[Sync] Dropping snapshot with bad payload: {}", e),
            },
            ServerMessage::YjsUpdate { payload_b64 } => match decode_payload(&payload_b64) {
                Ok(bytes) => self.on_update(&bytes),
                Err(e) => tracing::warn!("[Sync] Dropping update with bad payload: {}", e),
            },
            ServerMessage::PartnerChat {
                content,
                sender_id,
                sent_at,
                client_id,
            } => {
                return Some(IncomingChat {
                    content,
                    sender_id,
                    sent_at,
                    client_id,
                })
            }
            ServerMessage::Left { room_id } => match room_id {
                Some(room_id) if room_id != self.room_id => {
                    tracing::debug!("[Sync] Ignoring LEFT for room {}", room_id);
                }
                _ => self.on_peer_left(),
            },
            ServerMessage::Error { message } => self.on_relay_error(message),
        }
        None
    }

    /// Transport opened: join the room
    pub fn on_open(&mut self) {
        let join = ClientMessage::JoinRoom {
            room_id: self.room_id.clone(),
        };
        match self.transport.send(join) {
            Ok(()) => {
                tracing::info!("[Sync] Joining room {}", self.room_id);
                self.status = SyncStatus::Joined;
            }
            Err(e) => {
                tracing::error!("[Sync] Could not send join: {}", e);
                self.status = SyncStatus::Error(e.to_string());
            }
        }
    }

    /// Full snapshot from the relay
    pub fn on_snapshot(&mut self, bytes: &[u8]) {
        if !self.apply_inbound(bytes) {
            return;
        }

        if self.synced {
            tracing::info!("[Sync] Merged repeated snapshot");
        } else {
            tracing::info!("[Sync] Initial snapshot applied");
        }
        self.synced = true;
        if !matches!(self.status, SyncStatus::Error(_)) {
            self.status = SyncStatus::Synced;
        }

        self.reconcile_surface();
        self.flush_unsynced(bytes);
        self.seed_template();
    }

    /// Incremental update from the partner
    pub fn on_update(&mut self, bytes: &[u8]) {
        self.apply_inbound(bytes);
    }

    /// Relay-reported failure
    pub fn on_relay_error(&mut self, message: String) {
        tracing::warn!("[Sync] Relay error: {}", message);
        self.status = SyncStatus::Error(message);
    }

    /// The partner left the room; editing continues solo
    pub fn on_peer_left(&mut self) {
        tracing::info!("[Sync] Partner left room {}", self.room_id);
        self.peer_left = true;
    }

    /// The transport closed
    pub fn on_closed(&mut self, reason: &str) {
        tracing::info!("[Sync] Disconnected: {}", reason);
        self.status = SyncStatus::Disconnected;
    }

    /// Feed edits made on the surface into the document
    pub fn pump_surface(&mut self) {
        for batch in self.adapter.drain_local() {
            if let Some(change) = self.document.capture_local_change(&batch) {
                self.route(change);
            }
        }
    }

    /// Switch the editor language
    ///
    /// Seeds the new template if the shared buffer is still empty.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        self.seed_template();
    }

    /// Leave the room and close the connection
    pub fn quit(&mut self) {
        if self.transport.is_open() {
            if let Err(e) = self.transport.send(ClientMessage::LeaveRoom) {
                tracing::debug!("[Sync] Leave not sent: {}", e);
            }
        }
        self.transport.close();
        self.status = SyncStatus::Disconnected;
    }

    fn apply_inbound(&mut self, bytes: &[u8]) -> bool {
        let guard = Rc::clone(&self.guard);
        let _quiet = guard.suppress_network();
        match self.document.apply_remote(bytes) {
            Ok(change) => {
                self.route(change);
                true
            }
            Err(e) => {
                tracing::warn!("[Sync] Dropping remote payload: {}", e);
                false
            }
        }
    }

    fn reconcile_surface(&mut self) {
        let content = self.document.content();
        if !self.adapter.matches(&content) {
            tracing::info!("[Sync] Surface differs from document, overwriting");
            self.adapter.overwrite(&content);
        }
    }

    fn flush_unsynced(&mut self, snapshot: &[u8]) {
        if let Some(update) = self.document.missing_from(snapshot) {
            tracing::info!("[Sync] Sending {} bytes typed before sync", update.len());
            self.send_update(&update);
        }
    }

    fn seed_template(&mut self) {
        if !self.synced || !self.document.is_empty() {
            return;
        }
        if let Some(change) = self.document.insert_template(self.language.template()) {
            tracing::info!("[Sync] Seeded {} template", self.language);
            self.route(change);
        }
    }

    fn route(&mut self, change: DocumentChange) {
        if self.guard.should_write_surface(change.origin) {
            self.adapter.write_delta(&change.delta);
        }
        if self.guard.should_broadcast(change.origin) && self.synced {
            self.send_update(&change.update);
        }
    }

    fn send_update(&mut self, update: &[u8]) {
        match self.transport.send(ClientMessage::update(update)) {
            Ok(()) => self.updates_sent += 1,
            Err(e) => tracing::warn!("[Sync] Update not sent: {}", e),
        }
    }
}
