// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session Registry & Router.
//!
//! Maps live connections to identities and to the single conversation room
//! each connection observes, and owns all fan-out. No other component may
//! mutate room membership.
//!
//! The interior lock is held only for map mutation and snapshotting, never
//! across an await: delivery happens on a snapshot of the member senders,
//! so register/join/leave/unregister stay atomic per connection id while
//! sends proceed without the lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use solace_core::{ConnectionId, Identity};
use tokio::sync::mpsc;
use tracing::debug;

use crate::events::ServerEvent;

struct ConnectionEntry {
    identity: Identity,
    room: Option<String>,
    sender: mpsc::Sender<ServerEvent>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    by_identity: HashMap<String, HashSet<ConnectionId>>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

/// Registry of live connections, their identities, and room membership.
///
/// Created once at process start and handed to the gateway and pipeline by
/// reference; never ambient global state.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-mutation
        // of plain maps; the maps themselves are still consistent enough to
        // continue serving.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a connection for an identity. Idempotent per connection id:
    /// a second registration of the same id is a no-op and cannot reassign
    /// the owning identity.
    pub fn register(
        &self,
        connection_id: &ConnectionId,
        identity: Identity,
        sender: mpsc::Sender<ServerEvent>,
    ) {
        let mut inner = self.lock();
        if inner.connections.contains_key(connection_id) {
            return;
        }
        inner
            .by_identity
            .entry(identity.user_id.clone())
            .or_default()
            .insert(connection_id.clone());
        inner.connections.insert(
            connection_id.clone(),
            ConnectionEntry {
                identity,
                room: None,
                sender,
            },
        );
    }

    /// The identity owning a connection, if it is registered.
    pub fn identity_of(&self, connection_id: &ConnectionId) -> Option<Identity> {
        self.lock()
            .connections
            .get(connection_id)
            .map(|entry| entry.identity.clone())
    }

    /// The room a connection is currently joined to.
    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<String> {
        self.lock()
            .connections
            .get(connection_id)
            .and_then(|entry| entry.room.clone())
    }

    /// Joins a connection to a room, replacing any prior membership.
    ///
    /// Authorization (conversation ownership) is the caller's concern; the
    /// registry only tracks membership. Returns false for an unknown
    /// connection.
    pub fn join_room(&self, connection_id: &ConnectionId, conversation_id: &str) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.connections.get_mut(connection_id) else {
            return false;
        };
        let previous = entry.room.replace(conversation_id.to_string());
        if let Some(previous) = previous
            && let Some(members) = inner.rooms.get_mut(&previous)
        {
            members.remove(connection_id);
            if members.is_empty() {
                inner.rooms.remove(&previous);
            }
        }
        inner
            .rooms
            .entry(conversation_id.to_string())
            .or_default()
            .insert(connection_id.clone());
        true
    }

    /// Clears a connection's room membership. No-op if not joined.
    pub fn leave_room(&self, connection_id: &ConnectionId) {
        let mut inner = self.lock();
        let Some(entry) = inner.connections.get_mut(connection_id) else {
            return;
        };
        if let Some(room) = entry.room.take()
            && let Some(members) = inner.rooms.get_mut(&room)
        {
            members.remove(connection_id);
            if members.is_empty() {
                inner.rooms.remove(&room);
            }
        }
    }

    /// Removes a connection entirely. Returns true if this was the
    /// identity's last open connection (the identity is now offline for
    /// presence purposes).
    pub fn unregister(&self, connection_id: &ConnectionId) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.connections.remove(connection_id) else {
            return false;
        };
        if let Some(room) = entry.room
            && let Some(members) = inner.rooms.get_mut(&room)
        {
            members.remove(connection_id);
            if members.is_empty() {
                inner.rooms.remove(&room);
            }
        }
        let user_id = entry.identity.user_id;
        if let Some(connections) = inner.by_identity.get_mut(&user_id) {
            connections.remove(connection_id);
            if connections.is_empty() {
                inner.by_identity.remove(&user_id);
                return true;
            }
        }
        false
    }

    /// Removes every connection of an identity (teardown when the account
    /// goes inactive). Dropping the senders closes each connection's event
    /// channel.
    pub fn disconnect_identity(&self, user_id: &str) {
        let mut inner = self.lock();
        let Some(connection_ids) = inner.by_identity.remove(user_id) else {
            return;
        };
        for connection_id in connection_ids {
            if let Some(entry) = inner.connections.remove(&connection_id)
                && let Some(room) = entry.room
                && let Some(members) = inner.rooms.get_mut(&room)
            {
                members.remove(&connection_id);
                if members.is_empty() {
                    inner.rooms.remove(&room);
                }
            }
        }
        debug!(user_id, "identity disconnected");
    }

    /// Whether an identity has at least one open connection.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.lock().by_identity.contains_key(user_id)
    }

    /// User ids with at least one open connection.
    pub fn online_users(&self) -> Vec<String> {
        self.lock().by_identity.keys().cloned().collect()
    }

    fn room_senders(&self, conversation_id: &str) -> Vec<(ConnectionId, mpsc::Sender<ServerEvent>)> {
        let inner = self.lock();
        let Some(members) = inner.rooms.get(conversation_id) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|id| {
                inner
                    .connections
                    .get(id)
                    .map(|entry| (id.clone(), entry.sender.clone()))
            })
            .collect()
    }

    /// Delivers an event to every connection joined to the room.
    ///
    /// Each connection receives room events in the order they were
    /// broadcast; delivery order across connections is unspecified. Closed
    /// connections are skipped without error.
    pub async fn broadcast(&self, conversation_id: &str, event: ServerEvent) {
        for (connection_id, sender) in self.room_senders(conversation_id) {
            if sender.send(event.clone()).await.is_err() {
                debug!(%connection_id, "skipping closed connection in broadcast");
            }
        }
    }

    /// As [`broadcast`](Self::broadcast), excluding one connection (the
    /// typist, for typing relays).
    pub async fn broadcast_except(
        &self,
        conversation_id: &str,
        except: &ConnectionId,
        event: ServerEvent,
    ) {
        for (connection_id, sender) in self.room_senders(conversation_id) {
            if connection_id == *except {
                continue;
            }
            if sender.send(event.clone()).await.is_err() {
                debug!(%connection_id, "skipping closed connection in broadcast");
            }
        }
    }

    /// Delivers an event to a single connection. Skipped silently if the
    /// connection is gone or its channel is closed.
    pub async fn send_to_connection(&self, connection_id: &ConnectionId, event: ServerEvent) {
        let sender = self
            .lock()
            .connections
            .get(connection_id)
            .map(|entry| entry.sender.clone());
        if let Some(sender) = sender
            && sender.send(event).await.is_err()
        {
            debug!(%connection_id, "dropping event for closed connection");
        }
    }

    /// Delivers an event to every connection of an identity regardless of
    /// room.
    pub async fn send_to_identity(&self, user_id: &str, event: ServerEvent) {
        let senders: Vec<(ConnectionId, mpsc::Sender<ServerEvent>)> = {
            let inner = self.lock();
            inner
                .by_identity
                .get(user_id)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| {
                            inner
                                .connections
                                .get(id)
                                .map(|entry| (id.clone(), entry.sender.clone()))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };
        for (connection_id, sender) in senders {
            if sender.send(event.clone()).await.is_err() {
                debug!(%connection_id, "skipping closed connection for identity send");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(user_id: &str) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            role: "user".to_string(),
            active: true,
        }
    }

    fn connect(
        registry: &SessionRegistry,
        conn: &str,
        user: &str,
    ) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let connection_id = ConnectionId(conn.to_string());
        let (tx, rx) = mpsc::channel(16);
        registry.register(&connection_id, identity(user), tx);
        (connection_id, rx)
    }

    #[tokio::test]
    async fn register_is_idempotent_and_identity_is_set_once() {
        let registry = SessionRegistry::new();
        let (conn, _rx) = connect(&registry, "c1", "alice");

        // A second registration under a different identity must not
        // reassign the connection.
        let (tx2, _rx2) = mpsc::channel(16);
        registry.register(&conn, identity("mallory"), tx2);

        assert_eq!(registry.identity_of(&conn).unwrap().user_id, "alice");
        assert!(registry.is_online("alice"));
        assert!(!registry.is_online("mallory"));
    }

    #[tokio::test]
    async fn join_replaces_prior_room_membership() {
        let registry = SessionRegistry::new();
        let (conn, mut rx) = connect(&registry, "c1", "alice");

        assert!(registry.join_room(&conn, "conv-a"));
        assert!(registry.join_room(&conn, "conv-b"));
        assert_eq!(registry.room_of(&conn).as_deref(), Some("conv-b"));

        // Events to the old room no longer arrive.
        registry
            .broadcast("conv-a", ServerEvent::AiTyping { is_typing: true })
            .await;
        registry
            .broadcast("conv-b", ServerEvent::AiTyping { is_typing: false })
            .await;
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ServerEvent::AiTyping { is_typing: false }));
    }

    #[tokio::test]
    async fn broadcast_reaches_all_room_members_in_order() {
        let registry = SessionRegistry::new();
        let (c1, mut rx1) = connect(&registry, "c1", "alice");
        let (c2, mut rx2) = connect(&registry, "c2", "alice"); // second device
        registry.join_room(&c1, "conv-a");
        registry.join_room(&c2, "conv-a");

        for i in 0..3 {
            registry
                .broadcast(
                    "conv-a",
                    ServerEvent::UserTyping {
                        user_id: format!("u{i}"),
                        is_typing: true,
                    },
                )
                .await;
        }

        for rx in [&mut rx1, &mut rx2] {
            for i in 0..3 {
                match rx.recv().await.unwrap() {
                    ServerEvent::UserTyping { user_id, .. } => {
                        assert_eq!(user_id, format!("u{i}"))
                    }
                    other => panic!("unexpected event: {other:?}"),
                }
            }
        }
    }

    #[tokio::test]
    async fn broadcast_skips_closed_connections() {
        let registry = SessionRegistry::new();
        let (c1, rx1) = connect(&registry, "c1", "alice");
        let (c2, mut rx2) = connect(&registry, "c2", "bob");
        registry.join_room(&c1, "conv-a");
        registry.join_room(&c2, "conv-a");

        // Simulate a transport that died without unregistering yet.
        drop(rx1);

        registry
            .broadcast("conv-a", ServerEvent::AiTyping { is_typing: true })
            .await;
        // The live member still gets the event; no error escapes the fan-out.
        assert!(matches!(
            rx2.recv().await.unwrap(),
            ServerEvent::AiTyping { is_typing: true }
        ));
    }

    #[tokio::test]
    async fn broadcast_except_skips_the_typist() {
        let registry = SessionRegistry::new();
        let (c1, mut rx1) = connect(&registry, "c1", "alice");
        let (c2, mut rx2) = connect(&registry, "c2", "bob");
        registry.join_room(&c1, "conv-a");
        registry.join_room(&c2, "conv-a");

        registry
            .broadcast_except(
                "conv-a",
                &c1,
                ServerEvent::UserTyping {
                    user_id: "alice".into(),
                    is_typing: true,
                },
            )
            .await;

        assert!(rx2.recv().await.is_some());
        assert!(rx1.try_recv().is_err(), "typist must not receive the relay");
    }

    #[tokio::test]
    async fn unregister_reports_last_connection_offline() {
        let registry = SessionRegistry::new();
        let (c1, _rx1) = connect(&registry, "c1", "alice");
        let (c2, _rx2) = connect(&registry, "c2", "alice");

        assert!(!registry.unregister(&c1), "one device still connected");
        assert!(registry.is_online("alice"));
        assert!(registry.unregister(&c2), "last device disconnected");
        assert!(!registry.is_online("alice"));
        assert!(registry.online_users().is_empty());
    }

    #[tokio::test]
    async fn leave_room_is_a_noop_when_not_joined() {
        let registry = SessionRegistry::new();
        let (conn, _rx) = connect(&registry, "c1", "alice");
        registry.leave_room(&conn);
        assert!(registry.room_of(&conn).is_none());
    }

    #[tokio::test]
    async fn disconnect_identity_closes_every_device() {
        let registry = SessionRegistry::new();
        let (c1, mut rx1) = connect(&registry, "c1", "alice");
        let (_c2, mut rx2) = connect(&registry, "c2", "alice");
        registry.join_room(&c1, "conv-a");

        registry.disconnect_identity("alice");

        assert!(!registry.is_online("alice"));
        assert!(registry.identity_of(&c1).is_none());
        // Channels are closed once the registry drops its senders.
        assert!(rx1.recv().await.is_none());
        assert!(rx2.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_to_identity_reaches_all_devices() {
        let registry = SessionRegistry::new();
        let (_c1, mut rx1) = connect(&registry, "c1", "alice");
        let (_c2, mut rx2) = connect(&registry, "c2", "alice");
        let (_c3, mut rx3) = connect(&registry, "c3", "bob");

        registry
            .send_to_identity("alice", ServerEvent::AiTyping { is_typing: true })
            .await;

        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
        assert!(rx3.try_recv().is_err());
    }
}
