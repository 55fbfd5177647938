/**
 * Chat Relay Reconciler
 *
 * Keeps the session's chat panel: partner messages in both directions plus
 * assistant exchanges and local notices.
 *
 * Outgoing partner messages are appended optimistically as pending entries
 * carrying a locally generated correlation id. The relay echoes every partner
 * message to all members of the room, and the echo is the delivery
 * confirmation: when it comes back from our own identity with a known
 * correlation id, the pending entry is updated in place instead of appending
 * a duplicate.
 *
 * Messages from the other participant are appended and raise a
 * `PartnerNotice` with a single expiry deadline; a newer notice replaces both
 * the banner and the deadline.
 */
use crate::client::transport::{RelayTransport, TransportError};
use crate::shared::message::{ChatMessage, ChatRole, PartnerNotice};
use crate::shared::protocol::ClientMessage;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// How long a partner notice stays up unless dismissed
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(8);

const PARTNER_PREFIX: &str = "@partner";

/// Where a line typed into the chat input goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRoute {
    /// Addressed to the partner, prefix stripped
    Partner(String),
    /// Addressed to the coding assistant
    Assistant(String),
    /// `@partner` with nothing after it
    MissingPartnerBody,
    /// Blank input
    Empty,
}

/// Decide the recipient of a chat input line
///
/// Lines starting with `@partner` (any case, followed by whitespace or the
/// end of input) go to the partner; everything else goes to the assistant.
pub fn route_input(input: &str) -> ChatRoute {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ChatRoute::Empty;
    }

    let addressed = trimmed
        .get(..PARTNER_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(PARTNER_PREFIX));
    if addressed {
        let rest = &trimmed[PARTNER_PREFIX.len()..];
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let body = rest.trim();
            if body.is_empty() {
                return ChatRoute::MissingPartnerBody;
            }
            return ChatRoute::Partner(body.to_string());
        }
    }
    ChatRoute::Assistant(trimmed.to_string())
}

/// Generate a correlation id for an outgoing partner message
///
/// Format: `local-<unix millis>-<6 hex chars>`.
pub fn new_correlation_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "local-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &random[..6]
    )
}

/// What an incoming partner message did to the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatReceipt {
    /// Our pending entry at this index is now delivered
    Confirmed(usize),
    /// Repeated echo for an entry that was already delivered
    Refreshed(usize),
    /// Our own message with no matching pending entry, appended as delivered
    SelfAppended(usize),
    /// Message from the partner, appended and announced
    Peer(usize),
}

/// Chat panel state for one session
#[derive(Debug)]
pub struct ChatReconciler {
    identity: Option<String>,
    entries: Vec<ChatMessage>,
    by_correlation: HashMap<String, usize>,
    notice: Option<PartnerNotice>,
    notice_deadline: Option<Instant>,
    notice_ttl: Duration,
}

impl ChatReconciler {
    /// Create a reconciler
    ///
    /// # Arguments
    /// * `identity` - Local identity hint; `None` treats every incoming message as the partner's
    /// * `notice_ttl` - Lifetime of a partner notice
    pub fn new(identity: Option<String>, notice_ttl: Duration) -> Self {
        Self {
            identity,
            entries: Vec::new(),
            by_correlation: HashMap::new(),
            notice: None,
            notice_deadline: None,
            notice_ttl,
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    /// Number of outgoing partner messages awaiting their echo
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.pending).count()
    }

    /// Send a message to the partner
    ///
    /// On success the message is appended as pending and its correlation id
    /// returned. If the transport cannot take it, only a system entry is
    /// appended; nothing is retried.
    pub fn send_partner<T: RelayTransport + ?Sized>(
        &mut self,
        content: &str,
        transport: &T,
    ) -> Result<String, TransportError> {
        if !transport.is_open() {
            tracing::warn!("[Chat] Partner message not sent: transport closed");
            self.push_system("Failed to send message to partner: not connected to the room.");
            return Err(TransportError::NotOpen);
        }

        let client_id = new_correlation_id();
        let message = ClientMessage::PartnerChat {
            content: content.to_string(),
            client_id: client_id.clone(),
        };
        if let Err(e) = transport.send(message) {
            tracing::warn!("[Chat] Partner message not sent: {}", e);
            self.push_system(format!("Failed to send message to partner: {}", e));
            return Err(e);
        }

        let entry = ChatMessage::pending_partner(content, self.identity.as_deref(), &client_id);
        self.by_correlation.insert(client_id.clone(), self.entries.len());
        self.entries.push(entry);
        tracing::debug!("[Chat] Sent partner message {}", client_id);
        Ok(client_id)
    }

    /// Reconcile a `PARTNER_CHAT` delivered by the relay
    pub fn receive_partner(
        &mut self,
        content: String,
        sender_id: String,
        sent_at: String,
        client_id: Option<String>,
        now: Instant,
    ) -> ChatReceipt {
        let from_self = self.identity.as_deref() == Some(sender_id.as_str());

        if from_self {
            let known = client_id
                .as_ref()
                .and_then(|id| self.by_correlation.get(id))
                .copied();
            if let Some(index) = known {
                let entry = &mut self.entries[index];
                let was_pending = entry.pending;
                entry.content = content;
                entry.sender_id = Some(sender_id);
                entry.sent_at = Some(sent_at);
                entry.pending = false;
                entry.delivered = true;
                if was_pending {
                    tracing::debug!("[Chat] Delivery confirmed for entry {}", index);
                    return ChatReceipt::Confirmed(index);
                }
                return ChatReceipt::Refreshed(index);
            }

            let index = self.entries.len();
            if let Some(id) = &client_id {
                self.by_correlation.insert(id.clone(), index);
            }
            self.entries.push(ChatMessage::from_relay(
                ChatRole::SelfAuthored,
                content,
                sender_id,
                sent_at,
                client_id,
            ));
            return ChatReceipt::SelfAppended(index);
        }

        let index = self.entries.len();
        self.notice = Some(PartnerNotice {
            content: content.clone(),
            sent_at: sent_at.clone(),
        });
        self.notice_deadline = Some(now + self.notice_ttl);
        self.entries.push(ChatMessage::from_relay(
            ChatRole::Peer,
            content,
            sender_id,
            sent_at,
            client_id,
        ));
        tracing::info!("[Chat] Partner message received");
        ChatReceipt::Peer(index)
    }

    /// Banner currently shown, if any
    pub fn notice(&self) -> Option<&PartnerNotice> {
        self.notice.as_ref()
    }

    /// When the current notice expires
    pub fn notice_deadline(&self) -> Option<Instant> {
        self.notice_deadline
    }

    /// Remove the notice now
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
        self.notice_deadline = None;
    }

    /// Clear the notice if its deadline has passed
    ///
    /// Returns true if a notice was cleared.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        match self.notice_deadline {
            Some(deadline) if deadline <= now => {
                self.dismiss_notice();
                true
            }
            _ => false,
        }
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.entries.push(ChatMessage::system(content));
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.entries.push(ChatMessage::assistant(content));
    }
}
