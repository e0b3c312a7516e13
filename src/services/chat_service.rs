use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    errors::ChatError,
    models::{
        chat::{ChatRoom, RoomDetail, RoomList},
        message::{ChatMessage, MESSAGE_MAX_CHARS},
        user::ChatUser,
    },
    repositories::chat_store::ChatStore,
    utils::pagination::{resolve_page, DefaultPage, MESSAGES_PER_PAGE, ROOMS_PER_PAGE},
    websocket::{
        connection_manager::{ConnectionManager, RoomConnection},
        types::ServerEvent,
    },
};

/// Support chat operations shared by the HTTP handlers and the socket tasks.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    connections: ConnectionManager,
}

fn require_staff(user: &ChatUser) -> Result<(), ChatError> {
    if user.is_staff {
        Ok(())
    } else {
        Err(ChatError::PermissionDenied("staff only".to_string()))
    }
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, connections: ConnectionManager) -> Self {
        Self { store, connections }
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<ChatUser>, ChatError> {
        self.store.find_user(user_id).await
    }

    pub async fn open_room(&self, user: &ChatUser) -> Result<(ChatRoom, bool), ChatError> {
        let (room, created) = self.store.get_or_create_room(user).await?;
        if created {
            info!("Opened support room {} for {}", room.id, user.email);
        }
        Ok((room, created))
    }

    /// Loads a room the user may access. Rooms owned by someone else are
    /// reported as missing to non-staff callers.
    pub async fn room_for(&self, user: &ChatUser, room_id: Uuid) -> Result<ChatRoom, ChatError> {
        let room = self
            .store
            .find_room(room_id)
            .await?
            .ok_or_else(|| ChatError::NotFound("Room".to_string()))?;

        if !room.is_accessible_by(user.id, user.is_staff) {
            debug!("User {} denied access to room {}", user.id, room_id);
            return Err(ChatError::NotFound("Room".to_string()));
        }
        Ok(room)
    }

    pub async fn join(&self, user: &ChatUser, room_id: Uuid) -> Result<RoomConnection, ChatError> {
        let room = self
            .store
            .find_room(room_id)
            .await?
            .ok_or_else(|| ChatError::NotFound("Room".to_string()))?;
        self.connections.join(&room, user)
    }

    pub fn leave(&self, connection: &RoomConnection) {
        if let Err(e) = self.connections.leave(connection.room_id, connection.id) {
            error!("Failed to remove connection {}: {}", connection.id, e);
        }
    }

    /// Stores a message and fans it out to the room. The broadcast happens
    /// only after the write succeeded.
    pub async fn send_message(
        &self,
        author: &ChatUser,
        room_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::Validation("message must not be blank".to_string()));
        }
        if content.chars().count() > MESSAGE_MAX_CHARS {
            return Err(ChatError::Validation(format!(
                "message must be at most {} characters long",
                MESSAGE_MAX_CHARS
            )));
        }
        self.room_for(author, room_id).await?;

        let message = self.store.post_message(room_id, author, content).await?;
        let event = ServerEvent::chat_message(&message, author);

        match self.connections.broadcast(room_id, event) {
            Ok(delivered) => debug!("Message {} delivered to {} connections", message.id, delivered),
            Err(e) => error!("Failed to broadcast message {}: {}", message.id, e),
        }
        Ok(message)
    }

    pub fn send_typing(&self, user: &ChatUser, room_id: Uuid, is_typing: bool) -> Result<usize, ChatError> {
        self.connections.broadcast(room_id, ServerEvent::typing(user, is_typing))
    }

    /// Marks the counterpart's messages in a room as read.
    pub async fn mark_read(&self, reader: &ChatUser, room_id: Uuid) -> Result<u64, ChatError> {
        self.room_for(reader, room_id).await?;
        self.store.mark_read(room_id, reader.is_staff).await
    }

    /// Staff messages the room owner has not read yet.
    pub async fn unread_count_for_user(&self, room_id: Uuid) -> Result<i64, ChatError> {
        self.store.unread_count(room_id, false).await
    }

    /// Customer messages staff have not read yet.
    pub async fn unread_count_for_staff(&self, room_id: Uuid) -> Result<i64, ChatError> {
        self.store.unread_count(room_id, true).await
    }

    /// Badge count: for staff, every unread customer message; for a
    /// customer, unread replies in their own room.
    pub async fn notifications(&self, user: &ChatUser) -> Result<i64, ChatError> {
        if user.is_staff {
            return self.store.unread_total_for_staff().await;
        }
        match self.store.find_room_by_user(user.id).await? {
            Some(room) => self.unread_count_for_user(room.id).await,
            None => Ok(0),
        }
    }

    /// One page of a room's history. Viewing marks the counterpart's
    /// messages as read.
    pub async fn history(
        &self,
        viewer: &ChatUser,
        room_id: Uuid,
        page: Option<i64>,
    ) -> Result<RoomDetail, ChatError> {
        let room = self.room_for(viewer, room_id).await?;
        self.store.mark_read(room.id, viewer.is_staff).await?;

        let total = self.store.count_messages(room.id).await?;
        let page = resolve_page(page, total, MESSAGES_PER_PAGE, DefaultPage::Last);
        let messages = self.store.list_messages(room.id, page.offset, page.limit).await?;
        let unread_for_user = self.unread_count_for_user(room.id).await?;
        let unread_for_staff = self.unread_count_for_staff(room.id).await?;

        Ok(RoomDetail {
            room,
            messages,
            page,
            unread_for_user,
            unread_for_staff,
        })
    }

    /// Customer side of the support page: posting into one's own room also
    /// acknowledges the staff replies above it.
    pub async fn post_to_own_room(&self, user: &ChatUser, content: &str) -> Result<ChatMessage, ChatError> {
        let (room, _) = self.open_room(user).await?;
        let message = self.send_message(user, room.id, content).await?;
        self.store.mark_read(room.id, user.is_staff).await?;
        Ok(message)
    }

    pub async fn admin_history(
        &self,
        staff: &ChatUser,
        room_id: Uuid,
        page: Option<i64>,
    ) -> Result<RoomDetail, ChatError> {
        require_staff(staff)?;
        self.history(staff, room_id, page).await
    }

    pub async fn admin_reply(
        &self,
        staff: &ChatUser,
        room_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, ChatError> {
        require_staff(staff)?;
        self.send_message(staff, room_id, content).await
    }

    pub async fn admin_rooms(
        &self,
        staff: &ChatUser,
        search: Option<&str>,
        page: Option<i64>,
    ) -> Result<RoomList, ChatError> {
        require_staff(staff)?;

        let total = self.store.count_active_rooms(search).await?;
        let page = resolve_page(page, total, ROOMS_PER_PAGE, DefaultPage::First);
        let rooms = self.store.list_active_rooms(search, page.offset, page.limit).await?;

        Ok(RoomList {
            rooms,
            search: search.unwrap_or_default().to_string(),
            page,
        })
    }

    pub async fn set_room_active(
        &self,
        staff: &ChatUser,
        room_id: Uuid,
        is_active: bool,
    ) -> Result<ChatRoom, ChatError> {
        require_staff(staff)?;
        let room = self.store.set_room_active(room_id, is_active).await?;
        info!("Room {} set active={} by {}", room_id, is_active, staff.email);
        Ok(room)
    }
}
