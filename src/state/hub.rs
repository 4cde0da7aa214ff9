//! Per-session fan-out: broadcast rooms plus directly addressable connections.
//!
//! WebSocket connections receive everything through their own queue, so events reach a
//! socket in emission order. The broadcast rooms feed SSE subscribers.

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::{
    dto::events::ServerEvent,
    state::{quiz::PlayerId, registry::normalize_session_id},
};

/// Broadcast channel wrapper shared by WebSocket and SSE subscribers.
pub struct Room {
    sender: broadcast::Sender<ServerEvent>,
}

impl Room {
    /// Construct a new room backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// What a connection identified itself as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRole {
    Player(PlayerId),
    Display,
    Admin,
}

#[derive(Clone)]
/// Handle used to push messages to one connected socket.
pub struct Connection {
    pub id: Uuid,
    pub role: ConnectionRole,
    pub tx: mpsc::UnboundedSender<Message>,
}

impl Connection {
    /// Queue a serialized event; `false` when the socket is gone.
    pub fn send(&self, event: &ServerEvent) -> bool {
        self.tx.send(Message::Text(event.data.clone().into())).is_ok()
    }

    /// Ask the writer task to close the socket.
    pub fn close(&self) {
        let _ = self.tx.send(Message::Close(None));
    }
}

/// Rooms and connections of one session.
pub struct SessionHub {
    players: Room,
    admins: Room,
    connections: DashMap<Uuid, Connection>,
    active_players: DashMap<PlayerId, Uuid>,
}

impl SessionHub {
    fn new(capacity: usize) -> Self {
        Self {
            players: Room::new(capacity),
            admins: Room::new(capacity),
            connections: DashMap::new(),
            active_players: DashMap::new(),
        }
    }

    /// Room shared by players and display screens.
    pub fn players(&self) -> &Room {
        &self.players
    }

    pub fn admins(&self) -> &Room {
        &self.admins
    }

    /// Deliver to every player and display socket, then to the players room.
    pub fn publish_players(&self, event: &ServerEvent) {
        self.send_where(event, |role| !matches!(role, ConnectionRole::Admin));
        self.players.broadcast(event.clone());
    }

    /// Deliver to every admin socket, then to the admins room.
    pub fn publish_admins(&self, event: &ServerEvent) {
        self.send_where(event, |role| matches!(role, ConnectionRole::Admin));
        self.admins.broadcast(event.clone());
    }

    fn send_where(&self, event: &ServerEvent, accept: impl Fn(&ConnectionRole) -> bool) {
        for connection in self.connections.iter().filter(|entry| accept(&entry.role)) {
            connection.send(event);
        }
    }

    /// Track a connection. Player connections become the player's active one and the
    /// connection they displaced, if any, is returned.
    pub fn register(&self, connection: Connection) -> Option<Connection> {
        let displaced = match &connection.role {
            ConnectionRole::Player(player_id) => self
                .active_players
                .insert(player_id.clone(), connection.id)
                .filter(|previous| *previous != connection.id)
                .and_then(|previous| self.connections.remove(&previous))
                .map(|(_, previous)| previous),
            _ => None,
        };
        self.connections.insert(connection.id, connection);
        displaced
    }

    /// Forget a connection after its socket closed.
    pub fn unregister(&self, connection_id: Uuid) {
        let Some((_, connection)) = self.connections.remove(&connection_id) else {
            return;
        };
        if let ConnectionRole::Player(player_id) = connection.role {
            self.active_players
                .remove_if(&player_id, |_, active| *active == connection_id);
        }
    }

    pub fn send_to_connection(&self, connection_id: Uuid, event: &ServerEvent) -> bool {
        self.connections
            .get(&connection_id)
            .map(|connection| connection.send(event))
            .unwrap_or(false)
    }

    /// Deliver to the player's active connection; `false` when offline.
    pub fn send_to_player(&self, player_id: &str, event: &ServerEvent) -> bool {
        let Some(connection_id) = self.active_players.get(player_id).map(|entry| *entry.value())
        else {
            return false;
        };
        self.send_to_connection(connection_id, event)
    }

    pub fn is_player_online(&self, player_id: &str) -> bool {
        self.active_players.contains_key(player_id)
    }

    /// Close every player connection and return how many were closed.
    pub fn disconnect_players(&self) -> usize {
        let player_connections: Vec<Uuid> = self
            .connections
            .iter()
            .filter(|entry| matches!(entry.role, ConnectionRole::Player(_)))
            .map(|entry| *entry.key())
            .collect();
        for connection_id in &player_connections {
            if let Some((_, connection)) = self.connections.remove(connection_id) {
                connection.close();
            }
        }
        self.active_players.clear();
        player_connections.len()
    }

    /// Close every connection, whatever its role, and return how many were closed.
    pub fn close_all(&self) -> usize {
        let ids: Vec<Uuid> = self.connections.iter().map(|entry| *entry.key()).collect();
        let mut closed = 0;
        for connection_id in ids {
            if let Some((_, connection)) = self.connections.remove(&connection_id) {
                connection.close();
                closed += 1;
            }
        }
        self.active_players.clear();
        closed
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Session hubs keyed by normalized session identifier.
///
/// Hubs are created for registered sessions only and dropped with them.
pub struct NotificationHub {
    sessions: DashMap<String, Arc<SessionHub>>,
    capacity: usize,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            capacity,
        }
    }

    /// Hub for `session_id`, created if nobody subscribed yet. Callers check the session exists.
    pub fn session(&self, session_id: &str) -> Arc<SessionHub> {
        self.sessions
            .entry(normalize_session_id(session_id))
            .or_insert_with(|| Arc::new(SessionHub::new(self.capacity)))
            .value()
            .clone()
    }

    /// Existing hub for `session_id` without creating one.
    pub fn existing(&self, session_id: &str) -> Option<Arc<SessionHub>> {
        self.sessions
            .get(&normalize_session_id(session_id))
            .map(|entry| entry.value().clone())
    }

    /// Every hub currently allocated.
    pub fn all(&self) -> Vec<Arc<SessionHub>> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Detach the hub of a removed session. Its rooms close once the last handle drops.
    pub fn remove(&self, session_id: &str) -> Option<Arc<SessionHub>> {
        self.sessions
            .remove(&normalize_session_id(session_id))
            .map(|(_, hub)| hub)
    }

    /// Identifiers of every allocated hub.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(role: ConnectionRole) -> (Connection, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Connection {
                id: Uuid::new_v4(),
                role,
                tx,
            },
            rx,
        )
    }

    fn event(data: &str) -> ServerEvent {
        ServerEvent {
            event: Some("test".into()),
            data: data.into(),
        }
    }

    #[test]
    fn second_player_connection_displaces_first() {
        let hub = SessionHub::new(8);
        let (first, _first_rx) = connection(ConnectionRole::Player("p1".into()));
        let first_id = first.id;
        assert!(hub.register(first).is_none());

        let (second, mut second_rx) = connection(ConnectionRole::Player("p1".into()));
        let displaced = hub.register(second).expect("first connection displaced");
        assert_eq!(displaced.id, first_id);

        assert!(hub.send_to_player("p1", &event("hello")));
        match second_rx.try_recv() {
            Ok(Message::Text(text)) => assert_eq!(text.as_str(), "hello"),
            other => panic!("unexpected message: {other:?}"),
        }

        hub.unregister(first_id);
        assert!(hub.is_player_online("p1"));
    }

    #[test]
    fn unregister_takes_player_offline() {
        let hub = SessionHub::new(8);
        let (conn, _rx) = connection(ConnectionRole::Player("p1".into()));
        let id = conn.id;
        hub.register(conn);
        hub.unregister(id);
        assert!(!hub.is_player_online("p1"));
        assert!(!hub.send_to_player("p1", &event("x")));
    }

    #[test]
    fn disconnect_players_spares_admins() {
        let hub = SessionHub::new(8);
        let (player, mut player_rx) = connection(ConnectionRole::Player("p1".into()));
        let (admin, _admin_rx) = connection(ConnectionRole::Admin);
        hub.register(player);
        hub.register(admin);

        assert_eq!(hub.disconnect_players(), 1);
        assert_eq!(hub.connection_count(), 1);
        assert!(matches!(player_rx.try_recv(), Ok(Message::Close(None))));
    }

    #[test]
    fn publish_reaches_sockets_by_role() {
        let hub = SessionHub::new(8);
        let (player, mut player_rx) = connection(ConnectionRole::Player("p1".into()));
        let (display, mut display_rx) = connection(ConnectionRole::Display);
        let (admin, mut admin_rx) = connection(ConnectionRole::Admin);
        hub.register(player);
        hub.register(display);
        hub.register(admin);

        hub.publish_players(&event("question"));
        hub.publish_admins(&event("answers_progress"));

        assert!(matches!(player_rx.try_recv(), Ok(Message::Text(text)) if text.as_str() == "question"));
        assert!(matches!(display_rx.try_recv(), Ok(Message::Text(text)) if text.as_str() == "question"));
        assert!(matches!(admin_rx.try_recv(), Ok(Message::Text(text)) if text.as_str() == "answers_progress"));
        assert!(player_rx.try_recv().is_err());
        assert!(admin_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn rooms_fan_out_to_subscribers() {
        let hubs = NotificationHub::new(8);
        let hub = hubs.session("global");
        let mut rx = hubs.session("GLOBAL").players().subscribe();
        hub.players().broadcast(event("tick"));
        assert_eq!(rx.recv().await.unwrap().data, "tick");
        assert!(hubs.existing("other").is_none());
    }

    #[test]
    fn close_all_drops_every_role() {
        let hub = SessionHub::new(8);
        let (player, mut player_rx) = connection(ConnectionRole::Player("p1".into()));
        let (admin, mut admin_rx) = connection(ConnectionRole::Admin);
        hub.register(player);
        hub.register(admin);

        assert_eq!(hub.close_all(), 2);
        assert_eq!(hub.connection_count(), 0);
        assert!(!hub.is_player_online("p1"));
        assert!(matches!(player_rx.try_recv(), Ok(Message::Close(None))));
        assert!(matches!(admin_rx.try_recv(), Ok(Message::Close(None))));
    }

    #[tokio::test]
    async fn removed_hub_closes_its_rooms() {
        let hubs = NotificationHub::new(8);
        let mut rx = hubs.session("night").players().subscribe();
        assert_eq!(hubs.len(), 1);

        assert!(hubs.remove("NIGHT").is_some());
        assert!(hubs.is_empty());
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
