// src/websocket/connection_manager.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ChatError;
use crate::models::{chat::ChatRoom, user::ChatUser};

use super::types::ServerEvent;

pub type ConnectionId = Uuid;

/// Handle a joined socket keeps for its lifetime.
pub struct RoomConnection {
    pub id: ConnectionId,
    pub room_id: Uuid,
    pub receiver: mpsc::UnboundedReceiver<ServerEvent>,
}

/// Live sockets grouped by room.
///
/// One instance is built at startup and shared through `AppState`; the map
/// behind the mutex is the only mutable state shared between sockets.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    rooms: Arc<Mutex<HashMap<Uuid, HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room's broadcast group. Only the room owner and
    /// staff may join.
    pub fn join(&self, room: &ChatRoom, user: &ChatUser) -> Result<RoomConnection, ChatError> {
        if !room.is_accessible_by(user.id, user.is_staff) {
            warn!("User {} refused from room {}", user.id, room.id);
            return Err(ChatError::PermissionDenied(format!(
                "user {} may not join room {}",
                user.id, room.id
            )));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        let mut rooms = self.rooms.lock().map_err(|_| ChatError::LockPoisoned)?;
        rooms.entry(room.id).or_insert_with(HashMap::new).insert(id, sender);
        debug!("Connection {} joined room {}", id, room.id);

        Ok(RoomConnection {
            id,
            room_id: room.id,
            receiver,
        })
    }

    pub fn leave(&self, room_id: Uuid, connection_id: ConnectionId) -> Result<(), ChatError> {
        let mut rooms = self.rooms.lock().map_err(|_| ChatError::LockPoisoned)?;

        if let Some(connections) = rooms.get_mut(&room_id) {
            connections.remove(&connection_id);

            if connections.is_empty() {
                rooms.remove(&room_id);
            }
        }
        debug!("Connection {} left room {}", connection_id, room_id);

        Ok(())
    }

    /// Sends `event` to every connection currently in the room and returns
    /// how many received it. Connections whose socket task is gone are pruned.
    pub fn broadcast(&self, room_id: Uuid, event: ServerEvent) -> Result<usize, ChatError> {
        let mut rooms = self.rooms.lock().map_err(|_| ChatError::LockPoisoned)?;

        let Some(connections) = rooms.get_mut(&room_id) else {
            return Ok(0);
        };

        connections.retain(|_, sender| sender.send(event.clone()).is_ok());
        let delivered = connections.len();
        if connections.is_empty() {
            rooms.remove(&room_id);
        }

        Ok(delivered)
    }

    pub fn connection_count(&self, room_id: Uuid) -> usize {
        self.rooms
            .lock()
            .map(|rooms| rooms.get(&room_id).map_or(0, HashMap::len))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(is_staff: bool) -> ChatUser {
        ChatUser {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            is_staff,
            avatar_url: None,
        }
    }

    fn room_of(owner: &ChatUser) -> ChatRoom {
        ChatRoom {
            id: Uuid::new_v4(),
            user_id: owner.id,
            title: ChatRoom::default_title(&owner.email),
            is_active: true,
            created_at: Utc::now(),
            last_activity: Utc::now(),
        }
    }

    fn typing(user: &ChatUser) -> ServerEvent {
        ServerEvent::typing(user, true)
    }

    #[test]
    fn owner_and_staff_may_join() {
        let manager = ConnectionManager::new();
        let owner = user(false);
        let room = room_of(&owner);

        assert!(manager.join(&room, &owner).is_ok());
        assert!(manager.join(&room, &user(true)).is_ok());
        assert_eq!(manager.connection_count(room.id), 2);
    }

    #[test]
    fn strangers_are_refused_and_never_receive() {
        let manager = ConnectionManager::new();
        let owner = user(false);
        let room = room_of(&owner);
        let _owner_conn = manager.join(&room, &owner).unwrap();

        let err = manager.join(&room, &user(false)).err().unwrap();
        assert!(matches!(err, ChatError::PermissionDenied(_)));
        assert_eq!(manager.broadcast(room.id, typing(&owner)).unwrap(), 1);
    }

    #[test]
    fn broadcast_reaches_only_the_target_room() {
        let manager = ConnectionManager::new();
        let (a, b) = (user(false), user(false));
        let (room_a, room_b) = (room_of(&a), room_of(&b));

        let mut in_a = manager.join(&room_a, &a).unwrap();
        let mut staff_in_a = manager.join(&room_a, &user(true)).unwrap();
        let mut in_b = manager.join(&room_b, &b).unwrap();

        assert_eq!(manager.broadcast(room_a.id, typing(&a)).unwrap(), 2);

        assert_eq!(in_a.receiver.try_recv().unwrap(), typing(&a));
        assert_eq!(staff_in_a.receiver.try_recv().unwrap(), typing(&a));
        assert!(in_b.receiver.try_recv().is_err());
    }

    #[test]
    fn delivery_keeps_broadcast_order() {
        let manager = ConnectionManager::new();
        let owner = user(false);
        let room = room_of(&owner);
        let mut conn = manager.join(&room, &owner).unwrap();

        for is_typing in [true, false, true] {
            manager.broadcast(room.id, ServerEvent::typing(&owner, is_typing)).unwrap();
        }

        let received: Vec<ServerEvent> = std::iter::from_fn(|| conn.receiver.try_recv().ok()).collect();
        assert_eq!(
            received,
            vec![
                ServerEvent::typing(&owner, true),
                ServerEvent::typing(&owner, false),
                ServerEvent::typing(&owner, true),
            ]
        );
    }

    #[test]
    fn leave_removes_the_connection() {
        let manager = ConnectionManager::new();
        let owner = user(false);
        let room = room_of(&owner);
        let conn = manager.join(&room, &owner).unwrap();
        let mut staff = manager.join(&room, &user(true)).unwrap();

        manager.leave(room.id, conn.id).unwrap();

        assert_eq!(manager.connection_count(room.id), 1);
        assert_eq!(manager.broadcast(room.id, typing(&owner)).unwrap(), 1);
        assert!(staff.receiver.try_recv().is_ok());

        manager.leave(room.id, staff.id).unwrap();
        assert_eq!(manager.broadcast(room.id, typing(&owner)).unwrap(), 0);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let manager = ConnectionManager::new();
        let owner = user(false);
        let room = room_of(&owner);
        let conn = manager.join(&room, &owner).unwrap();
        drop(conn);

        assert_eq!(manager.broadcast(room.id, typing(&owner)).unwrap(), 0);
        assert_eq!(manager.connection_count(room.id), 0);
    }
}
