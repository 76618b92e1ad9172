//! Quillboard WebSocket Relay Server
//!
//! Broadcasts replica updates between clients sharing a document room.
//! Rooms are named `<namespace>/<uuid>` where the namespace is one of
//! `editor`, `canvas` or `code`.
//!
//! ## Protocol
//!
//! Messages are JSON with the following format:
//! ```json
//! { "type": "join", "room": "canvas/5b2e..." }
//! { "type": "sync", "data": "<base64-encoded-replica-bytes>" }
//! { "type": "awareness", "peer_id": 123, "cursor": { "x": 100, "y": 200 } }
//! ```

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, net::SocketAddr, sync::Arc};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;
const ROOM_NAMESPACES: [&str; 3] = ["editor", "canvas", "code"];

/// A message sent by clients
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

/// Awareness state for a peer
#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// A message broadcast to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm room join with current state
    Joined {
        room: String,
        peer_count: usize,
        /// Accumulated room state (if any peer synced before)
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

/// `<namespace>/<uuid>` with a known namespace.
fn valid_room(room: &str) -> bool {
    let Some((namespace, id)) = room.split_once('/') else {
        return false;
    };
    ROOM_NAMESPACES.contains(&namespace) && Uuid::parse_str(id).is_ok()
}

/// Room state
struct Room {
    tx: broadcast::Sender<(String, ServerMessage)>,
    peers: HashSet<String>,
    /// Last sync payload, handed to new joiners
    last_sync: Option<String>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
            last_sync: None,
        }
    }
}

/// Shared application state
struct AppState {
    rooms: DashMap<String, Room>,
}

impl AppState {
    fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    fn join_room(
        &self,
        room_id: &str,
        peer_id: &str,
    ) -> (
        broadcast::Receiver<(String, ServerMessage)>,
        Option<String>,
        usize,
    ) {
        let mut room = self.rooms.entry(room_id.to_string()).or_insert_with(Room::new);
        room.peers.insert(peer_id.to_string());
        let rx = room.tx.subscribe();
        let initial_sync = room.last_sync.clone();
        let peer_count = room.peers.len();
        (rx, initial_sync, peer_count)
    }

    fn leave_room(&self, room_id: &str, peer_id: &str) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.peers.remove(peer_id);
            // Clean up empty rooms
            if room.peers.is_empty() {
                drop(room);
                self.rooms.remove(room_id);
            }
        }
    }

    fn update_sync(&self, room_id: &str, data: String) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.last_sync = Some(data);
        }
    }

    fn broadcast(&self, room_id: &str, from: &str, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(room_id) {
            let _ = room.tx.send((from.to_string(), msg));
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quillboard_server=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 4040));
    info!("Quillboard relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://localhost:4040/ws");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn index() -> &'static str {
    "Quillboard Relay Server - Connect via WebSocket at /ws"
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_room: Option<String> = None;
    let mut room_rx: Option<broadcast::Receiver<(String, ServerMessage)>> = None;

    loop {
        tokio::select! {
            // Incoming messages from this client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                match client_msg {
                                    ClientMessage::Join { room } => {
                                        if !valid_room(&room) {
                                            warn!("Peer {} requested invalid room {}", peer_id, room);
                                            let err = ServerMessage::Error {
                                                message: format!("Invalid room: {}", room),
                                            };
                                            let _ = sender.send(Message::Text(serde_json::to_string(&err).unwrap().into())).await;
                                            continue;
                                        }

                                        // Leave current room if any
                                        if let Some(ref old_room) = current_room {
                                            state.leave_room(old_room, &peer_id);
                                            state.broadcast(old_room, &peer_id, ServerMessage::PeerLeft {
                                                peer_id: peer_id.clone(),
                                            });
                                        }

                                        let (rx, initial_sync, peer_count) = state.join_room(&room, &peer_id);
                                        room_rx = Some(rx);
                                        current_room = Some(room.clone());

                                        let joined = ServerMessage::Joined {
                                            room: room.clone(),
                                            peer_count,
                                            initial_sync,
                                        };
                                        if sender.send(Message::Text(serde_json::to_string(&joined).unwrap().into())).await.is_err() {
                                            break;
                                        }

                                        state.broadcast(&room, &peer_id, ServerMessage::PeerJoined {
                                            peer_id: peer_id.clone(),
                                        });

                                        info!("Peer {} joined room {}", peer_id, room);
                                    }
                                    ClientMessage::Leave => {
                                        if let Some(ref room) = current_room {
                                            state.leave_room(room, &peer_id);
                                            state.broadcast(room, &peer_id, ServerMessage::PeerLeft {
                                                peer_id: peer_id.clone(),
                                            });
                                            info!("Peer {} left room {}", peer_id, room);
                                        }
                                        current_room = None;
                                        room_rx = None;
                                    }
                                    ClientMessage::Sync { data } => {
                                        if let Some(ref room) = current_room {
                                            // Keep as room state for new joiners
                                            state.update_sync(room, data.clone());
                                            state.broadcast(room, &peer_id, ServerMessage::Sync {
                                                from: peer_id.clone(),
                                                data,
                                            });
                                        }
                                    }
                                    ClientMessage::Awareness { peer_id: awareness_peer_id, state: awareness_state } => {
                                        if let Some(ref room) = current_room {
                                            state.broadcast(room, &peer_id, ServerMessage::Awareness {
                                                from: peer_id.clone(),
                                                peer_id: awareness_peer_id,
                                                state: awareness_state,
                                            });
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                warn!("Invalid message from {}: {}", peer_id, e);
                                let err = ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                };
                                let _ = sender.send(Message::Text(serde_json::to_string(&err).unwrap().into())).await;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        // Binary frames carry raw replica bytes
                        if let Some(ref room) = current_room {
                            let data_b64 = BASE64.encode(&data);
                            state.update_sync(room, data_b64.clone());
                            state.broadcast(room, &peer_id, ServerMessage::Sync {
                                from: peer_id.clone(),
                                data: data_b64,
                            });
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            // Broadcasts from the joined room
            msg = async {
                match &mut room_rx {
                    Some(rx) => rx.recv().await.ok(),
                    None => {
                        // No room joined, just wait forever
                        std::future::pending::<Option<(String, ServerMessage)>>().await
                    }
                }
            } => {
                if let Some((from, server_msg)) = msg {
                    // Don't echo back to sender
                    if from != peer_id {
                        let json = serde_json::to_string(&server_msg).unwrap();
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    if let Some(ref room) = current_room {
        state.leave_room(room, &peer_id);
        state.broadcast(room, &peer_id, ServerMessage::PeerLeft {
            peer_id: peer_id.clone(),
        });
    }
    info!("Connection closed: {}", peer_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_rooms() {
        let id = Uuid::new_v4();
        assert!(valid_room(&format!("editor/{id}")));
        assert!(valid_room(&format!("canvas/{id}")));
        assert!(valid_room(&format!("code/{id}")));
    }

    #[test]
    fn test_invalid_rooms() {
        let id = Uuid::new_v4();
        assert!(!valid_room("editor"));
        assert!(!valid_room(&format!("wiki/{id}")));
        assert!(!valid_room("canvas/not-a-uuid"));
        assert!(!valid_room(""));
    }

    #[test]
    fn test_join_tracks_peers_and_history() {
        let state = AppState::new();
        let room = format!("canvas/{}", Uuid::new_v4());

        let (_rx, initial, count) = state.join_room(&room, "p1");
        assert!(initial.is_none());
        assert_eq!(count, 1);

        state.update_sync(&room, "payload".to_string());
        let (_rx2, initial, count) = state.join_room(&room, "p2");
        assert_eq!(initial.as_deref(), Some("payload"));
        assert_eq!(count, 2);
    }

    #[test]
    fn test_empty_room_is_removed() {
        let state = AppState::new();
        let room = format!("editor/{}", Uuid::new_v4());

        let (_rx, _, _) = state.join_room(&room, "p1");
        assert!(state.rooms.contains_key(&room));

        state.leave_room(&room, "p1");
        assert!(!state.rooms.contains_key(&room));
    }
}
