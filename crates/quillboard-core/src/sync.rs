//! WebSocket client and wire protocol for collaboration.
//!
//! Messages are JSON with a `type` tag; replica payloads travel as base64
//! inside the JSON text frames. The client runs on a background thread and
//! is polled for events.

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tungstenite::{Message, connect};
use url::Url;

/// Messages sent to the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room
    Join { room: String },
    /// Leave current room
    Leave,
    /// Replica payload (base64 encoded bytes)
    Sync { data: String },
    /// Awareness update (cursor position, user identity)
    Awareness {
        peer_id: u64,
        #[serde(flatten)]
        state: AwarenessState,
    },
}

/// Messages received from the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm room join with current state
    Joined {
        room: String,
        peer_count: usize,
        /// Initial sync data (if room has history)
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_sync: Option<String>,
    },
    /// Peer joined the room
    PeerJoined { peer_id: String },
    /// Peer left the room
    PeerLeft { peer_id: String },
    /// Replica payload from another peer
    Sync { from: String, data: String },
    /// Awareness update from another peer
    Awareness {
        from: String,
        peer_id: u64,
        #[serde(flatten)]
        state: AwarenessState,
    },
    /// Error message
    Error { message: String },
}

/// Transient per-peer state, not part of the replicated document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AwarenessState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub color: String,
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events surfaced to the session layer.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    /// Joined a room, possibly with the room's accumulated state
    JoinedRoom {
        room: String,
        peer_count: usize,
        initial_sync: Option<Vec<u8>>,
    },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// Replica payload from a peer
    SyncReceived { from: String, data: Vec<u8> },
    AwarenessReceived {
        from: String,
        peer_id: u64,
        state: AwarenessState,
    },
    Error { message: String },
}

/// Encode a replica payload for the wire.
pub fn encode_payload(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Decode a wire payload. `None` on invalid base64.
pub fn decode_payload(input: &str) -> Option<Vec<u8>> {
    BASE64.decode(input).ok()
}

/// Translate a parsed server message into a [`SyncEvent`]. `None` when the
/// payload fails to decode.
fn event_from_message(msg: ServerMessage) -> Option<SyncEvent> {
    Some(match msg {
        ServerMessage::Joined { room, peer_count, initial_sync } => SyncEvent::JoinedRoom {
            room,
            peer_count,
            initial_sync: initial_sync.and_then(|s| decode_payload(&s)),
        },
        ServerMessage::PeerJoined { peer_id } => SyncEvent::PeerJoined { peer_id },
        ServerMessage::PeerLeft { peer_id } => SyncEvent::PeerLeft { peer_id },
        ServerMessage::Sync { from, data } => SyncEvent::SyncReceived {
            from,
            data: decode_payload(&data)?,
        },
        ServerMessage::Awareness { from, peer_id, state } => {
            SyncEvent::AwarenessReceived { from, peer_id, state }
        }
        ServerMessage::Error { message } => SyncEvent::Error { message },
    })
}

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket client backed by a background thread.
///
/// Commands go to the thread over a channel; events come back the same way
/// and are drained with [`poll_events`](Self::poll_events).
pub struct NativeWebSocket {
    state: ConnectionState,
    events: Vec<SyncEvent>,
    cmd_tx: Option<Sender<WsCommand>>,
    event_rx: Option<Receiver<SyncEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    /// Create a new disconnected client.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            events: Vec::new(),
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Connect to a relay server.
    pub fn connect(&mut self, url: &str) -> Result<(), String> {
        if self.cmd_tx.is_some() {
            return Err("Already connected".to_string());
        }

        let parsed = Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(format!("Invalid WebSocket URL scheme: {}", parsed.scheme()));
        }

        self.state = ConnectionState::Connecting;

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<SyncEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);

        Ok(())
    }

    /// Disconnect from the server.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Send a protocol message.
    pub fn send(&self, msg: &ClientMessage) -> Result<(), String> {
        let text = serde_json::to_string(msg).map_err(|e| format!("Serialize failed: {}", e))?;
        self.send_text(text)
    }

    fn send_text(&self, msg: String) -> Result<(), String> {
        if let Some(ref tx) = self.cmd_tx {
            tx.send(WsCommand::Send(msg))
                .map_err(|e| format!("Send failed: {}", e))
        } else {
            Err("Not connected".to_string())
        }
    }

    /// Drain pending events (non-blocking).
    pub fn poll_events(&mut self) -> Vec<SyncEvent> {
        if let Some(ref rx) = self.event_rx {
            while let Ok(event) = rx.try_recv() {
                match &event {
                    SyncEvent::Connected => self.state = ConnectionState::Connected,
                    SyncEvent::Disconnected => self.state = ConnectionState::Disconnected,
                    SyncEvent::Error { .. } => self.state = ConnectionState::Error,
                    _ => {}
                }
                self.events.push(event);
            }
        }

        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<SyncEvent>) {
    log::info!("WebSocket thread: connecting to {}", url);

    let (mut socket, response) = match connect(url) {
        Ok(ok) => ok,
        Err(e) => {
            log::error!("WebSocket connection failed: {}", e);
            let _ = event_tx.send(SyncEvent::Error {
                message: format!("Connection failed: {}", e),
            });
            return;
        }
    };

    log::info!("WebSocket connected, status: {}", response.status());
    let _ = event_tx.send(SyncEvent::Connected);

    // Short read timeout so the loop can interleave reads with commands.
    if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
        let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("WebSocket sending: {}", &msg[..msg.len().min(100)]);
                if let Err(e) = socket.send(Message::Text(msg)) {
                    log::error!("WebSocket send error: {}", e);
                    break;
                }
            }
            Ok(WsCommand::Close) => {
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                Ok(msg) => {
                    if let Some(event) = event_from_message(msg) {
                        let _ = event_tx.send(event);
                    }
                }
                Err(_) => log::warn!("Failed to parse server message: {}", txt),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // Ignore binary, pong
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                break;
            }
        }
    }

    log::info!("WebSocket thread exiting");
    let _ = event_tx.send(SyncEvent::Disconnected);
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let data = b"Hello, World!";
        let encoded = encode_payload(data);
        assert_eq!(decode_payload(&encoded).unwrap(), data.to_vec());
    }

    #[test]
    fn test_payload_empty() {
        assert_eq!(decode_payload(&encode_payload(b"")).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_rejects_invalid_input() {
        assert!(decode_payload("not base64!!!").is_none());
    }

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::Join { room: "canvas/test-room".to_string() };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"join""#));
        assert!(json.contains("canvas/test-room"));
    }

    #[test]
    fn test_server_message_deserialize() {
        let json = r#"{"type":"joined","room":"editor/abc","peer_count":2}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        match msg {
            ServerMessage::Joined { room, peer_count, initial_sync } => {
                assert_eq!(room, "editor/abc");
                assert_eq!(peer_count, 2);
                assert!(initial_sync.is_none());
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_sync_event_from_sync_message() {
        let msg = ServerMessage::Sync {
            from: "peer-1".to_string(),
            data: encode_payload(b"\x01\x02\x03"),
        };
        match event_from_message(msg) {
            Some(SyncEvent::SyncReceived { from, data }) => {
                assert_eq!(from, "peer-1");
                assert_eq!(data, vec![1, 2, 3]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_sync_event_drops_bad_payload() {
        let msg = ServerMessage::Sync {
            from: "peer-1".to_string(),
            data: "???".to_string(),
        };
        assert!(event_from_message(msg).is_none());
    }
}
