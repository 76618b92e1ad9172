//! Collaboration sessions over replicated documents.
//!
//! Each open document gets a [`CollabSession`] tied to a relay room named
//! `<namespace>/<id>`. The [`SessionManager`] owns all sessions, routes
//! incoming [`SyncEvent`]s to them, coordinates undo across documents by
//! edit recency, and notifies presence subscribers.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::crdt::{MAX_UNDO_STEPS, ReplicaDoc};
use crate::sync::{AwarenessState, ClientMessage, SyncEvent, UserInfo, encode_payload};

/// Errors from the collaboration layer. Only the affected file is lost.
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("Failed to load file {id}: {reason}")]
    LoadFile { id: Uuid, reason: String },
}

/// The kind of document behind a session. Determines the room namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    Editor,
    Canvas,
    Code,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Editor => "editor",
            DocKind::Canvas => "canvas",
            DocKind::Code => "code",
        }
    }

    /// Relay room name for a document of this kind.
    pub fn room(&self, id: Uuid) -> String {
        format!("{}/{}", self.as_str(), id)
    }
}

/// Presence changes surfaced to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    PeerJoined { session: Uuid, peer_id: String },
    PeerLeft { session: Uuid, peer_id: String },
}

/// Handle for a presence subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// One collaborative document session.
pub struct CollabSession {
    pub id: Uuid,
    pub kind: DocKind,
    pub room: String,
    pub replica: ReplicaDoc,
    pub awareness: AwarenessState,
    /// True once the relay confirmed the join.
    pub started: bool,
    /// True once initial state arrived and the document can be shown.
    pub rendered: bool,
    /// Set on relay errors for this session, cleared by the next
    /// successful join.
    pub error: bool,
    /// Connected peer ids as reported by the relay.
    pub peers: Vec<String>,
    outgoing: Vec<ClientMessage>,
}

impl CollabSession {
    fn new(id: Uuid, kind: DocKind, replica: ReplicaDoc) -> Self {
        let room = kind.room(id);
        let user = ephemeral_identity(replica.peer_id());
        Self {
            id,
            kind,
            room,
            replica,
            awareness: AwarenessState {
                cursor: None,
                user: Some(user),
            },
            started: false,
            rendered: false,
            error: false,
            peers: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    /// Queue a broadcast of the full local state. Snapshot imports merge,
    /// so receivers converge no matter how many broadcasts they see.
    pub fn broadcast_snapshot(&mut self) {
        let data = encode_payload(&self.replica.export_snapshot());
        self.outgoing.push(ClientMessage::Sync { data });
    }

    /// Queue an awareness broadcast with the current local state.
    pub fn broadcast_awareness(&mut self) {
        self.outgoing.push(ClientMessage::Awareness {
            peer_id: self.replica.peer_id(),
            state: self.awareness.clone(),
        });
    }

    /// Drain queued outgoing messages.
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    /// Peers currently in the room, besides this one.
    pub fn connected_user_count(&self) -> usize {
        self.peers.len()
    }
}

/// Deterministic throwaway identity derived from the replica's peer id.
fn ephemeral_identity(peer_id: u64) -> UserInfo {
    const ADJECTIVES: [&str; 8] = [
        "brisk", "calm", "eager", "gentle", "keen", "quiet", "swift", "warm",
    ];
    const ANIMALS: [&str; 8] = [
        "heron", "lynx", "marten", "otter", "puffin", "stoat", "tern", "vole",
    ];
    const COLORS: [&str; 6] = [
        "#e07a5f", "#3d405b", "#81b29a", "#f2cc8f", "#6d597a", "#457b9d",
    ];

    let adjective = ADJECTIVES[(peer_id % ADJECTIVES.len() as u64) as usize];
    let animal = ANIMALS[((peer_id >> 8) % ANIMALS.len() as u64) as usize];
    let color = COLORS[((peer_id >> 16) % COLORS.len() as u64) as usize];
    UserInfo {
        name: format!("{adjective}-{animal}"),
        color: color.to_string(),
    }
}

/// Orders undo and redo across documents by edit recency.
///
/// Each local edit is recorded against its session; undo targets the most
/// recently edited document, wherever it is. Undo and redo on empty stacks
/// are no-ops.
#[derive(Debug, Default)]
pub struct UndoCoordinator {
    edits: Vec<Uuid>,
    redos: Vec<Uuid>,
}

impl UndoCoordinator {
    /// Record a local edit against a session. Clears the redo stack.
    pub fn record_edit(&mut self, session: Uuid) {
        self.edits.push(session);
        self.redos.clear();
        // Edits beyond the replica undo depth can never be undone.
        if self.edits.len() > MAX_UNDO_STEPS {
            let excess = self.edits.len() - MAX_UNDO_STEPS;
            self.edits.drain(..excess);
        }
    }

    /// The session that should undo next, if any.
    pub fn pop_undo(&mut self) -> Option<Uuid> {
        let session = self.edits.pop()?;
        self.redos.push(session);
        Some(session)
    }

    /// The session that should redo next, if any.
    pub fn pop_redo(&mut self) -> Option<Uuid> {
        let session = self.redos.pop()?;
        self.edits.push(session);
        Some(session)
    }

    /// Forget history referring to a destroyed session.
    pub fn forget(&mut self, session: Uuid) {
        self.edits.retain(|s| *s != session);
        self.redos.retain(|s| *s != session);
    }
}

/// Owns all active collaboration sessions.
pub struct SessionManager {
    sessions: HashMap<Uuid, CollabSession>,
    undo: UndoCoordinator,
    subscriptions: Vec<(SubscriptionId, Vec<PresenceEvent>)>,
    next_subscription: u64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            undo: UndoCoordinator::default(),
            subscriptions: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Start a session for a document, seeding the replica from persisted
    /// bytes when available. Idempotent: a second init for the same id
    /// leaves the existing session untouched. Malformed persisted bytes
    /// fail only this file.
    pub fn init(
        &mut self,
        id: Uuid,
        kind: DocKind,
        snapshot: Option<&[u8]>,
    ) -> Result<&mut CollabSession, CollabError> {
        self.create(id, kind, snapshot, true)
    }

    /// Start a local-only session: no relay join is queued and the document
    /// is ready to show immediately.
    pub fn init_local(
        &mut self,
        id: Uuid,
        kind: DocKind,
        snapshot: Option<&[u8]>,
    ) -> Result<&mut CollabSession, CollabError> {
        self.create(id, kind, snapshot, false)
    }

    fn create(
        &mut self,
        id: Uuid,
        kind: DocKind,
        snapshot: Option<&[u8]>,
        online: bool,
    ) -> Result<&mut CollabSession, CollabError> {
        if !self.sessions.contains_key(&id) {
            let replica = match snapshot {
                Some(bytes) => {
                    ReplicaDoc::from_snapshot(bytes).map_err(|e| CollabError::LoadFile {
                        id,
                        reason: e.to_string(),
                    })?
                }
                None => ReplicaDoc::new(),
            };
            let mut session = CollabSession::new(id, kind, replica);
            if online {
                session.outgoing.push(ClientMessage::Join {
                    room: session.room.clone(),
                });
            } else {
                session.rendered = true;
            }
            self.sessions.insert(id, session);
        }
        Ok(self.sessions.get_mut(&id).unwrap())
    }

    pub fn session(&self, id: Uuid) -> Option<&CollabSession> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: Uuid) -> Option<&mut CollabSession> {
        self.sessions.get_mut(&id)
    }

    /// Tear down a session. Safe to call for ids that were never started.
    pub fn destroy(&mut self, id: Uuid) {
        if let Some(mut session) = self.sessions.remove(&id) {
            session.outgoing.clear();
            self.undo.forget(id);
        }
    }

    /// Route a relay event to its session. Events for unknown (destroyed)
    /// sessions are dropped.
    pub fn handle_event(&mut self, id: Uuid, event: SyncEvent) {
        let Some(session) = self.sessions.get_mut(&id) else {
            log::debug!("Dropping event for unknown session {id}");
            return;
        };

        match event {
            SyncEvent::JoinedRoom { initial_sync, .. } => {
                session.started = true;
                // A successful connect clears any earlier error.
                session.error = false;
                if let Some(bytes) = initial_sync {
                    if let Err(e) = session.replica.import(&bytes) {
                        log::error!("Initial sync import failed for {id}: {e}");
                        session.error = true;
                    }
                }
                // Merge local history back into the room so a rejoin after
                // offline edits converges without duplication.
                session.broadcast_snapshot();
                session.rendered = true;
            }
            SyncEvent::SyncReceived { data, .. } => {
                if let Err(e) = session.replica.import(&data) {
                    log::error!("Sync import failed for {id}: {e}");
                    session.error = true;
                }
            }
            SyncEvent::PeerJoined { peer_id } => {
                if !session.peers.contains(&peer_id) {
                    session.peers.push(peer_id.clone());
                }
                self.notify(PresenceEvent::PeerJoined { session: id, peer_id });
            }
            SyncEvent::PeerLeft { peer_id } => {
                session.peers.retain(|p| *p != peer_id);
                self.notify(PresenceEvent::PeerLeft { session: id, peer_id });
            }
            SyncEvent::Error { message } => {
                log::error!("Relay error for {id}: {message}");
                session.error = true;
            }
            SyncEvent::Connected | SyncEvent::Disconnected => {}
            SyncEvent::AwarenessReceived { .. } => {}
        }
    }

    /// Record a local edit for cross-document undo ordering.
    pub fn record_edit(&mut self, id: Uuid) {
        if self.sessions.contains_key(&id) {
            self.undo.record_edit(id);
        }
    }

    /// Undo the most recent local edit, whichever document holds it.
    /// Returns the affected session id, or `None` when there is nothing to
    /// undo.
    pub fn undo(&mut self) -> Option<Uuid> {
        let id = self.undo.pop_undo()?;
        let session = self.sessions.get_mut(&id)?;
        if session.replica.undo() {
            session.broadcast_snapshot();
            Some(id)
        } else {
            None
        }
    }

    /// Redo the most recently undone edit.
    pub fn redo(&mut self) -> Option<Uuid> {
        let id = self.undo.pop_redo()?;
        let session = self.sessions.get_mut(&id)?;
        if session.replica.redo() {
            session.broadcast_snapshot();
            Some(id)
        } else {
            None
        }
    }

    /// Subscribe to presence changes across all sessions.
    pub fn subscribe_presence(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push((id, Vec::new()));
        id
    }

    /// Drain pending presence events for a subscription.
    pub fn take_presence(&mut self, subscription: SubscriptionId) -> Vec<PresenceEvent> {
        self.subscriptions
            .iter_mut()
            .find(|(id, _)| *id == subscription)
            .map(|(_, events)| std::mem::take(events))
            .unwrap_or_default()
    }

    pub fn unsubscribe_presence(&mut self, subscription: SubscriptionId) {
        self.subscriptions.retain(|(id, _)| *id != subscription);
    }

    fn notify(&mut self, event: PresenceEvent) {
        // Subscribers observe events in registration order.
        for (_, events) in &mut self.subscriptions {
            events.push(event.clone());
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{EditorElement, Element, ElementBox};
    use crate::sync::decode_payload;

    /// Deliver one manager's queued sync payloads to another, as the relay
    /// would.
    fn relay(from: &mut SessionManager, to: &mut SessionManager, doc: Uuid) {
        for message in from.session_mut(doc).unwrap().take_outgoing() {
            if let ClientMessage::Sync { data } = message {
                let bytes = decode_payload(&data).unwrap();
                to.handle_event(
                    doc,
                    SyncEvent::SyncReceived { from: "peer".into(), data: bytes },
                );
            }
        }
    }

    #[test]
    fn test_room_naming() {
        let id = Uuid::nil();
        assert_eq!(DocKind::Editor.room(id), format!("editor/{id}"));
        assert_eq!(DocKind::Canvas.room(id), format!("canvas/{id}"));
        assert_eq!(DocKind::Code.room(id), format!("code/{id}"));
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();

        manager.init(id, DocKind::Editor, None).unwrap();
        manager
            .session_mut(id)
            .unwrap()
            .replica
            .insert_content(0, "draft")
            .unwrap();

        // Second init must not reset the replica.
        manager.init(id, DocKind::Editor, None).unwrap();
        assert_eq!(manager.session(id).unwrap().replica.content(), "draft");
    }

    #[test]
    fn test_init_queues_join() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        let session = manager.init(id, DocKind::Canvas, None).unwrap();

        let outgoing = session.take_outgoing();
        assert!(matches!(
            &outgoing[..],
            [ClientMessage::Join { room }] if *room == format!("canvas/{id}")
        ));
    }

    #[test]
    fn test_init_seeds_from_snapshot() {
        let mut source = ReplicaDoc::new();
        source.insert_content(0, "persisted").unwrap();
        let bytes = source.export_snapshot();

        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        let session = manager.init(id, DocKind::Editor, Some(&bytes)).unwrap();
        assert_eq!(session.replica.content(), "persisted");
    }

    #[test]
    fn test_init_rejects_malformed_snapshot() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        let result = manager.init(id, DocKind::Editor, Some(b"garbage"));
        assert!(matches!(result, Err(CollabError::LoadFile { id: bad, .. }) if bad == id));
        // The failed init leaves no session behind.
        assert!(manager.session(id).is_none());
    }

    #[test]
    fn test_local_session_is_rendered_immediately() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        let session = manager.init_local(id, DocKind::Editor, None).unwrap();

        assert!(session.rendered);
        assert!(!session.started);
        assert!(session.take_outgoing().is_empty());
    }

    #[test]
    fn test_two_sessions_converge_over_sync_messages() {
        let mut m1 = SessionManager::new();
        let mut m2 = SessionManager::new();
        let doc = Uuid::new_v4();
        m1.init(doc, DocKind::Canvas, None).unwrap();
        m2.init(doc, DocKind::Canvas, None).unwrap();
        m1.session_mut(doc).unwrap().take_outgoing();
        m2.session_mut(doc).unwrap().take_outgoing();

        let element_id = Uuid::new_v4();
        let element = Element::Editor(EditorElement {
            bounds: ElementBox::new(element_id, 20.0, 30.0, 300.0, 350.0),
        });
        {
            let session = m1.session_mut(doc).unwrap();
            session.replica.set_element(&element).unwrap();
            session.broadcast_snapshot();
        }
        relay(&mut m1, &mut m2, doc);

        let replica = &m2.session(doc).unwrap().replica;
        assert_eq!(replica.element_count(), 1);
        let rect = replica.get_element(element_id).unwrap().rect().unwrap();
        assert_eq!(rect.x0, 20.0);
        assert_eq!(rect.y0, 30.0);

        // Re-broadcasting the same state must not duplicate it.
        m1.session_mut(doc).unwrap().broadcast_snapshot();
        relay(&mut m1, &mut m2, doc);
        assert_eq!(m2.session(doc).unwrap().replica.element_count(), 1);
    }

    #[test]
    fn test_rejoin_merges_without_duplication() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        manager.init(id, DocKind::Editor, None).unwrap();
        manager
            .session_mut(id)
            .unwrap()
            .replica
            .insert_content(0, "Hello")
            .unwrap();
        let local = manager.session(id).unwrap().replica.export_snapshot();

        // The room already holds this peer's own earlier history.
        manager.handle_event(
            id,
            SyncEvent::JoinedRoom {
                room: format!("editor/{id}"),
                peer_count: 1,
                initial_sync: Some(local),
            },
        );

        let session = manager.session(id).unwrap();
        assert_eq!(session.replica.content(), "Hello");
        assert!(session.started);
        assert!(session.rendered);
    }

    #[test]
    fn test_joined_broadcasts_local_state() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        manager.init(id, DocKind::Editor, None).unwrap();
        manager.session_mut(id).unwrap().take_outgoing();

        manager.handle_event(
            id,
            SyncEvent::JoinedRoom {
                room: format!("editor/{id}"),
                peer_count: 2,
                initial_sync: None,
            },
        );

        let outgoing = manager.session_mut(id).unwrap().take_outgoing();
        assert!(matches!(&outgoing[..], [ClientMessage::Sync { .. }]));
    }

    #[test]
    fn test_relay_error_sets_flag() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        manager.init(id, DocKind::Code, None).unwrap();

        manager.handle_event(id, SyncEvent::Error { message: "room full".into() });
        assert!(manager.session(id).unwrap().error);
    }

    #[test]
    fn test_stale_event_after_destroy_is_dropped() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        manager.init(id, DocKind::Editor, None).unwrap();
        manager.destroy(id);

        // Must not panic or resurrect the session.
        manager.handle_event(
            id,
            SyncEvent::SyncReceived { from: "peer".into(), data: vec![1, 2, 3] },
        );
        assert!(manager.session(id).is_none());
    }

    #[test]
    fn test_destroy_unknown_session_is_noop() {
        let mut manager = SessionManager::new();
        manager.destroy(Uuid::new_v4());
    }

    #[test]
    fn test_undo_targets_most_recent_edit() {
        let mut manager = SessionManager::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        manager.init(a, DocKind::Editor, None).unwrap();
        manager.init(b, DocKind::Editor, None).unwrap();

        manager.session_mut(a).unwrap().replica.insert_content(0, "one").unwrap();
        manager.record_edit(a);
        manager.session_mut(b).unwrap().replica.insert_content(0, "two").unwrap();
        manager.record_edit(b);

        assert_eq!(manager.undo(), Some(b));
        assert_eq!(manager.session(b).unwrap().replica.content(), "");
        assert_eq!(manager.session(a).unwrap().replica.content(), "one");

        assert_eq!(manager.undo(), Some(a));
        assert_eq!(manager.session(a).unwrap().replica.content(), "");
    }

    #[test]
    fn test_undo_empty_is_noop() {
        let mut manager = SessionManager::new();
        assert!(manager.undo().is_none());
        assert!(manager.redo().is_none());
    }

    #[test]
    fn test_redo_follows_undo() {
        let mut manager = SessionManager::new();
        let a = Uuid::new_v4();
        manager.init(a, DocKind::Editor, None).unwrap();
        manager.session_mut(a).unwrap().replica.insert_content(0, "text").unwrap();
        manager.record_edit(a);

        assert_eq!(manager.undo(), Some(a));
        assert_eq!(manager.redo(), Some(a));
        assert_eq!(manager.session(a).unwrap().replica.content(), "text");
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut coordinator = UndoCoordinator::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        coordinator.record_edit(a);
        coordinator.pop_undo();
        coordinator.record_edit(b);

        assert_eq!(coordinator.pop_redo(), None);
    }

    #[test]
    fn test_edit_history_is_bounded() {
        let mut coordinator = UndoCoordinator::default();
        let a = Uuid::new_v4();
        for _ in 0..MAX_UNDO_STEPS + 50 {
            coordinator.record_edit(a);
        }

        let mut undoable = 0;
        while coordinator.pop_undo().is_some() {
            undoable += 1;
        }
        assert_eq!(undoable, MAX_UNDO_STEPS);
    }

    #[test]
    fn test_presence_subscription() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        manager.init(id, DocKind::Canvas, None).unwrap();

        let first = manager.subscribe_presence();
        let second = manager.subscribe_presence();

        manager.handle_event(id, SyncEvent::PeerJoined { peer_id: "p1".into() });

        let expected = vec![PresenceEvent::PeerJoined { session: id, peer_id: "p1".into() }];
        assert_eq!(manager.take_presence(first), expected);
        assert_eq!(manager.take_presence(second), expected);

        manager.unsubscribe_presence(first);
        manager.handle_event(id, SyncEvent::PeerLeft { peer_id: "p1".into() });
        assert!(manager.take_presence(first).is_empty());
        assert_eq!(manager.take_presence(second).len(), 1);
    }

    #[test]
    fn test_peer_list_tracks_joins_and_leaves() {
        let mut manager = SessionManager::new();
        let id = Uuid::new_v4();
        manager.init(id, DocKind::Editor, None).unwrap();

        manager.handle_event(id, SyncEvent::PeerJoined { peer_id: "p1".into() });
        manager.handle_event(id, SyncEvent::PeerJoined { peer_id: "p2".into() });
        manager.handle_event(id, SyncEvent::PeerJoined { peer_id: "p1".into() });
        assert_eq!(manager.session(id).unwrap().peers, vec!["p1", "p2"]);

        manager.handle_event(id, SyncEvent::PeerLeft { peer_id: "p1".into() });
        assert_eq!(manager.session(id).unwrap().peers, vec!["p2"]);
    }

    #[test]
    fn test_ephemeral_identity_is_deterministic() {
        let a = ephemeral_identity(42);
        let b = ephemeral_identity(42);
        assert_eq!(a.name, b.name);
        assert_eq!(a.color, b.color);
        assert!(a.name.contains('-'));
    }
}
