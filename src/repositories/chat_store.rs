use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    errors::ChatError,
    models::{
        chat::{ChatRoom, RoomSummary},
        message::{ChatMessage, MessageView},
        user::ChatUser,
    },
};

/// Persistence of rooms and messages.
///
/// Implementations must keep at most one room per user and must update a
/// room's `last_activity` to the new message's `created_at` in the same write
/// that stores the message.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<ChatUser>, ChatError>;

    /// Returns the user's room, creating it on first use. The flag tells
    /// whether this call created it.
    async fn get_or_create_room(&self, user: &ChatUser) -> Result<(ChatRoom, bool), ChatError>;

    async fn find_room(&self, room_id: Uuid) -> Result<Option<ChatRoom>, ChatError>;

    async fn find_room_by_user(&self, user_id: Uuid) -> Result<Option<ChatRoom>, ChatError>;

    /// Fails with `NotFound` when the room no longer exists.
    async fn post_message(
        &self,
        room_id: Uuid,
        author: &ChatUser,
        content: &str,
    ) -> Result<ChatMessage, ChatError>;

    /// Flips unread messages written by the other party to read and returns
    /// how many changed.
    async fn mark_read(&self, room_id: Uuid, reader_is_staff: bool) -> Result<u64, ChatError>;

    async fn list_messages(
        &self,
        room_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MessageView>, ChatError>;

    async fn count_messages(&self, room_id: Uuid) -> Result<i64, ChatError>;

    /// Unread messages in a room addressed to staff (`for_staff`) or to the
    /// room owner.
    async fn unread_count(&self, room_id: Uuid, for_staff: bool) -> Result<i64, ChatError>;

    /// Unread customer messages over every room.
    async fn unread_total_for_staff(&self) -> Result<i64, ChatError>;

    async fn list_active_rooms(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RoomSummary>, ChatError>;

    async fn count_active_rooms(&self, search: Option<&str>) -> Result<i64, ChatError>;

    async fn set_room_active(&self, room_id: Uuid, is_active: bool) -> Result<ChatRoom, ChatError>;
}
