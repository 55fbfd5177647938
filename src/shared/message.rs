/**
 * Chat Entry Data Structures
 *
 * This module defines the entries shown in a session's chat panel: messages
 * to and from the partner, exchanges with the coding assistant, and system
 * notices. It also defines the ephemeral partner-arrived notice.
 *
 * Partner messages authored locally carry a client-assigned correlation id
 * and start out pending; the relay's echo flips them to delivered.
 */
use serde::{Deserialize, Serialize};

/// Who an entry in the chat panel belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ChatRole {
    /// Partner message written on this client
    SelfAuthored,
    /// Partner message written by the other participant
    Peer,
    /// Question addressed to the assistant from this client
    User,
    /// Assistant reply
    Assistant,
    /// Locally generated notice (send failures, usage hints)
    System,
}

/// Represents a single entry in the chat panel
///
/// # Fields
/// * `role` - Who the entry belongs to
/// * `content` - Text of the entry
/// * `sender_id` - Relay identity of the author (partner messages only)
/// * `sent_at` - RFC3339 timestamp
/// * `client_id` - Correlation id of an outgoing partner message
/// * `pending` / `delivered` - Delivery state of an outgoing partner message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub delivered: bool,
}

impl ChatMessage {
    fn plain(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sender_id: None,
            sent_at: None,
            client_id: None,
            pending: false,
            delivered: false,
        }
    }

    /// Optimistic entry for an outgoing partner message
    ///
    /// The sender falls back to `"self"` when the local identity is unknown.
    pub fn pending_partner(
        content: impl Into<String>,
        sender_id: Option<&str>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: Some(sender_id.unwrap_or("self").to_string()),
            sent_at: Some(get_timestamp()),
            client_id: Some(client_id.into()),
            pending: true,
            ..Self::plain(ChatRole::SelfAuthored, content)
        }
    }

    /// Partner message delivered by the relay
    pub fn from_relay(
        role: ChatRole,
        content: impl Into<String>,
        sender_id: impl Into<String>,
        sent_at: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            sender_id: Some(sender_id.into()),
            sent_at: Some(sent_at.into()),
            client_id,
            delivered: true,
            ..Self::plain(role, content)
        }
    }

    /// Local notice
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::System, content)
    }

    /// Question for the assistant
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::User, content)
    }

    /// Assistant reply
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::Assistant, content)
    }
}

/// Ephemeral banner raised when the partner sends a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartnerNotice {
    pub content: String,
    pub sent_at: String,
}

/// Get the current timestamp as an RFC3339 string
pub fn get_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
