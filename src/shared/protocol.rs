//! Relay Wire Protocol
//!
//! JSON messages exchanged over the single per-session WebSocket between a
//! pairing client and the relay. Every frame is an object tagged by `"type"`;
//! binary document deltas travel as standard base64 in `payloadB64`.
//!
//! | Direction | Type | Fields |
//! |---|---|---|
//! | client → relay | `JOIN_ROOM` | `roomId` |
//! | client → relay | `LEAVE_ROOM` | |
//! | client → relay | `YJS_UPDATE` | `payloadB64` |
//! | client → relay | `PARTNER_CHAT` | `content`, `clientId` |
//! | relay → client | `YJS_SYNC` | `payloadB64` |
//! | relay → client | `YJS_UPDATE` | `payloadB64` |
//! | relay → client | `PARTNER_CHAT` | `content`, `senderId`, `sentAt`, `clientId` |
//! | relay → client | `LEFT` | `roomId` |
//! | relay → client | `ERROR` | `message` |

use crate::shared::error::SharedError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Messages sent by a client to the relay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Enter a room after connecting
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String },
    /// Graceful exit
    LeaveRoom,
    /// One local document transaction
    #[serde(rename_all = "camelCase")]
    YjsUpdate { payload_b64: String },
    /// Chat addressed to the partner
    #[serde(rename_all = "camelCase")]
    PartnerChat { content: String, client_id: String },
}

/// Messages sent by the relay to a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Full document snapshot, sent after a join
    #[serde(rename_all = "camelCase")]
    YjsSync { payload_b64: String },
    /// Incremental delta from the other participant
    #[serde(rename_all = "camelCase")]
    YjsUpdate { payload_b64: String },
    /// Chat delivery, echoed to every member of the room including the sender
    #[serde(rename_all = "camelCase")]
    PartnerChat {
        content: String,
        sender_id: String,
        #[serde(default)]
        sent_at: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    /// A participant disconnected
    #[serde(rename_all = "camelCase")]
    Left {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
    },
    /// Relay-reported failure
    Error { message: String },
}

/// Encode a binary payload for the wire
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a wire payload back into bytes
pub fn decode_payload(payload_b64: &str) -> Result<Vec<u8>, SharedError> {
    Ok(STANDARD.decode(payload_b64)?)
}

impl ClientMessage {
    /// Wrap a binary document update
    pub fn update(bytes: &[u8]) -> Self {
        Self::YjsUpdate {
            payload_b64: encode_payload(bytes),
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame
    pub fn from_json(text: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerMessage {
    /// Wrap a full snapshot
    pub fn sync(bytes: &[u8]) -> Self {
        Self::YjsSync {
            payload_b64: encode_payload(bytes),
        }
    }

    /// Wrap an incremental update
    pub fn update(bytes: &[u8]) -> Self {
        Self::YjsUpdate {
            payload_b64: encode_payload(bytes),
        }
    }

    /// Build an error frame
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame
    pub fn from_json(text: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(text)?)
    }
}
