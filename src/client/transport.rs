//! # Session Transport
//!
//! One WebSocket per session to the relay. The socket is split into a reader
//! task, which decodes text frames into [`TransportEvent`]s, and a writer task,
//! which drains an unbounded queue of outgoing frames. Sends are fire and
//! forget; a slow relay simply grows the queue.
//!
//! The [`RelayTransport`] trait is the seam the sync controller is written
//! against, so tests can drive it with an in-memory transport.

use crate::shared::error::SharedError;
use crate::shared::protocol::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

/// Events raised by a transport towards the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed
    Opened,
    /// Decoded relay message
    Message(ServerMessage),
    /// Socket ended, for whatever reason
    Closed { reason: String },
}

/// Transport failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not open")]
    NotOpen,
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("could not encode message: {0}")]
    Encode(#[from] SharedError),
}

/// Outbound half of a relay connection
pub trait RelayTransport {
    /// Whether messages can currently be sent
    fn is_open(&self) -> bool;

    /// Queue a message for the relay
    fn send(&self, message: ClientMessage) -> Result<(), TransportError>;

    /// Close the connection; later sends fail with `NotOpen`
    fn close(&mut self);
}

/// Relay endpoint with the bearer credential as `token` query parameter
pub fn relay_endpoint(relay_url: &str, token: &str) -> Result<Url, TransportError> {
    let mut url =
        Url::parse(relay_url).map_err(|e| TransportError::InvalidUrl(format!("{relay_url}: {e}")))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(TransportError::InvalidUrl(format!(
            "{relay_url}: expected ws or wss scheme"
        )));
    }
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

enum WriteCommand {
    Frame(Message),
    Close,
}

/// WebSocket transport backed by `tokio-tungstenite`
pub struct WsTransport {
    write_tx: mpsc::UnboundedSender<WriteCommand>,
    open: Arc<AtomicBool>,
}

impl WsTransport {
    /// Start connecting to `url` in the background
    ///
    /// Returns immediately. The receiver yields `Opened` once the handshake
    /// completes, then relay messages, then exactly one `Closed`.
    pub fn connect(url: Url) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_connection(url, Arc::clone(&open), event_tx, write_tx.clone(), write_rx));

        (Self { write_tx, open }, event_rx)
    }

    /// Transport that never opens, for sessions that cannot connect
    ///
    /// The event receiver is already closed.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (_, event_rx) = mpsc::unbounded_channel();
        let (write_tx, _) = mpsc::unbounded_channel();
        let transport = Self {
            write_tx,
            open: Arc::new(AtomicBool::new(false)),
        };
        (transport, event_rx)
    }
}

impl RelayTransport for WsTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let text = message.to_json()?;
        self.write_tx
            .send(WriteCommand::Frame(Message::Text(text.into())))
            .map_err(|_| TransportError::NotOpen)
    }

    fn close(&mut self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.write_tx.send(WriteCommand::Close);
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection(
    url: Url,
    open: Arc<AtomicBool>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    write_tx: mpsc::UnboundedSender<WriteCommand>,
    write_rx: mpsc::UnboundedReceiver<WriteCommand>,
) {
    tracing::info!("[Sync] Connecting to relay at {}", redact(&url));

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::error!("[Sync] Relay connection failed: {}", e);
            let _ = event_tx.send(TransportEvent::Closed {
                reason: TransportError::Connect(e.to_string()).to_string(),
            });
            return;
        }
    };

    let (write, mut read) = ws_stream.split();
    let writer = tokio::spawn(run_writer(write, write_rx));

    open.store(true, Ordering::SeqCst);
    tracing::info!("[Sync] Relay connection open");
    let _ = event_tx.send(TransportEvent::Opened);

    let reason = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match ServerMessage::from_json(&text) {
                Ok(message) => {
                    if event_tx.send(TransportEvent::Message(message)).is_err() {
                        break "session dropped".to_string();
                    }
                }
                Err(e) => {
                    tracing::warn!("[Sync] Dropping undecodable relay frame: {}", e);
                }
            },
            Some(Ok(Message::Close(frame))) => {
                break frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "closed by relay".to_string());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => break e.to_string(),
            None => break "connection ended".to_string(),
        }
    };

    open.store(false, Ordering::SeqCst);
    let _ = write_tx.send(WriteCommand::Close);
    let _ = writer.await;
    tracing::info!("[Sync] Relay connection closed: {}", reason);
    let _ = event_tx.send(TransportEvent::Closed { reason });
}

async fn run_writer<S>(mut write: S, mut write_rx: mpsc::UnboundedReceiver<WriteCommand>)
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(command) = write_rx.recv().await {
        match command {
            WriteCommand::Frame(message) => {
                if let Err(e) = write.send(message).await {
                    tracing::warn!("[Sync] Relay write failed: {}", e);
                    break;
                }
            }
            WriteCommand::Close => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }
    let _ = write.close().await;
}

fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
