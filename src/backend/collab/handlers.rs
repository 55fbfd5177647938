/**
 * Relay Socket Handlers
 *
 * This module implements the WebSocket endpoint that pairing clients connect
 * to. It provides:
 * - GET /ws?token=<jwt> - Upgrade to the relay protocol after token verification
 *
 * Each socket gets a writer task fed by an unbounded channel; the room
 * registry holds a clone of that channel's sender so it can fan out to the
 * socket without touching the socket itself.
 */

use crate::backend::auth::verify_token;
use crate::backend::collab::state::Member;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::shared::protocol::{ClientMessage, ServerMessage};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Query parameters of the upgrade request
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// Handle a relay connection request (GET /ws)
///
/// Returns 401 if the token is missing or does not verify.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Result<Response, BackendError> {
    let token = params
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            tracing::warn!("[Relay] Connection without token");
            BackendError::unauthorized("missing token")
        })?;

    let claims = verify_token(&token, &state.config.jwt_secret).map_err(|e| {
        tracing::warn!("[Relay] Invalid token: {:?}", e);
        BackendError::unauthorized("invalid token")
    })?;

    tracing::info!("[Relay] Upgrading connection for {}", claims.sub);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, claims.sub)))
}

/// Per-connection state of one socket
struct Connection {
    conn_id: Uuid,
    user_id: String,
    tx: mpsc::UnboundedSender<ServerMessage>,
    room: Option<String>,
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("[Relay] Failed to encode frame: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut connection = Connection {
        conn_id: Uuid::new_v4(),
        user_id,
        tx,
        room: None,
    };

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("[Relay] Socket error for {}: {}", connection.conn_id, e);
                break;
            }
        };

        if let Err(e) = handle_frame(&state, &mut connection, text.as_str()).await {
            tracing::warn!("[Relay] Rejected frame from {}: {}", connection.user_id, e);
            let _ = connection.tx.send(ServerMessage::from(&e));
        }
    }

    if let Some(room_id) = connection.room.take() {
        state.rooms.leave(&room_id, connection.conn_id).await;
    }
    tracing::info!("[Relay] {} disconnected", connection.user_id);

    drop(connection);
    let _ = writer.await;
}

async fn handle_frame(
    state: &AppState,
    connection: &mut Connection,
    text: &str,
) -> Result<(), BackendError> {
    match ClientMessage::from_json(text)? {
        ClientMessage::JoinRoom { room_id } => {
            if let Some(previous) = connection.room.take() {
                state.rooms.leave(&previous, connection.conn_id).await;
            }
            let member = Member::new(
                connection.conn_id,
                connection.user_id.clone(),
                connection.tx.clone(),
            );
            state.rooms.join(&room_id, member).await?;
            connection.room = Some(room_id);
        }
        ClientMessage::LeaveRoom => {
            if let Some(room_id) = connection.room.take() {
                state.rooms.leave(&room_id, connection.conn_id).await;
            }
        }
        ClientMessage::YjsUpdate { payload_b64 } => {
            let room_id = connection.room.as_deref().ok_or(BackendError::NotJoined)?;
            state
                .rooms
                .apply_update(room_id, connection.conn_id, &payload_b64)
                .await?;
        }
        ClientMessage::PartnerChat { content, client_id } => {
            let room_id = connection.room.as_deref().ok_or(BackendError::NotJoined)?;
            state
                .rooms
                .broadcast_chat(room_id, &connection.user_id, content, client_id)
                .await?;
        }
    }
    Ok(())
}
