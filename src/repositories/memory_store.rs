use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::chat_store::ChatStore;
use crate::{
    errors::ChatError,
    models::{
        chat::{ChatRoom, RoomSummary},
        message::{ChatMessage, MessageView},
        user::ChatUser,
    },
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, ChatUser>,
    rooms: HashMap<Uuid, ChatRoom>,
    rooms_by_user: HashMap<Uuid, Uuid>,
    /// Messages in insertion order, which is also `created_at` order.
    messages: Vec<ChatMessage>,
}

/// Process-local store used for development runs and tests.
#[derive(Default)]
pub struct MemoryChatStore {
    tables: RwLock<Tables>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a user record.
    pub async fn upsert_user(&self, user: ChatUser) {
        self.tables.write().await.users.insert(user.id, user);
    }

    /// Drops a room together with its messages.
    #[allow(dead_code)]
    pub async fn delete_room(&self, room_id: Uuid) {
        let mut tables = self.tables.write().await;
        if let Some(room) = tables.rooms.remove(&room_id) {
            tables.rooms_by_user.remove(&room.user_id);
            tables.messages.retain(|m| m.room_id != room_id);
        }
    }
}

fn matches_search(room: &ChatRoom, email: &str, search: Option<&str>) -> bool {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(needle) => {
            let needle = needle.to_lowercase();
            email.to_lowercase().contains(&needle) || room.title.to_lowercase().contains(&needle)
        }
    }
}

impl Tables {
    fn unread(&self, room_id: Option<Uuid>, author_is_staff: bool) -> i64 {
        self.messages
            .iter()
            .filter(|m| room_id.map_or(true, |id| m.room_id == id))
            .filter(|m| m.author_is_staff == author_is_staff && !m.is_read)
            .count() as i64
    }

    fn active_rooms(&self, search: Option<&str>) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .values()
            .filter(|room| room.is_active)
            .filter_map(|room| {
                let email = self.users.get(&room.user_id).map(|u| u.email.clone())?;
                matches_search(room, &email, search).then(|| RoomSummary {
                    room: room.clone(),
                    user_email: email,
                    unread_count: self.unread(Some(room.id), false),
                })
            })
            .collect();
        rooms.sort_by(|a, b| b.room.last_activity.cmp(&a.room.last_activity));
        rooms
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<ChatUser>, ChatError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn get_or_create_room(&self, user: &ChatUser) -> Result<(ChatRoom, bool), ChatError> {
        let mut tables = self.tables.write().await;

        if let Some(room) = tables
            .rooms_by_user
            .get(&user.id)
            .and_then(|id| tables.rooms.get(id))
        {
            return Ok((room.clone(), false));
        }

        let now = Utc::now();
        let room = ChatRoom {
            id: Uuid::new_v4(),
            user_id: user.id,
            title: ChatRoom::default_title(&user.email),
            is_active: true,
            created_at: now,
            last_activity: now,
        };
        tables.rooms_by_user.insert(user.id, room.id);
        tables.rooms.insert(room.id, room.clone());
        Ok((room, true))
    }

    async fn find_room(&self, room_id: Uuid) -> Result<Option<ChatRoom>, ChatError> {
        Ok(self.tables.read().await.rooms.get(&room_id).cloned())
    }

    async fn find_room_by_user(&self, user_id: Uuid) -> Result<Option<ChatRoom>, ChatError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rooms_by_user
            .get(&user_id)
            .and_then(|id| tables.rooms.get(id))
            .cloned())
    }

    async fn post_message(
        &self,
        room_id: Uuid,
        author: &ChatUser,
        content: &str,
    ) -> Result<ChatMessage, ChatError> {
        let mut tables = self.tables.write().await;
        let created_at = Utc::now();

        let room = tables
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| ChatError::NotFound("Room".to_string()))?;
        room.last_activity = created_at;

        let message = ChatMessage {
            id: Uuid::new_v4(),
            room_id,
            author_id: author.id,
            author_is_staff: author.is_staff,
            content: content.to_string(),
            is_read: false,
            created_at,
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn mark_read(&self, room_id: Uuid, reader_is_staff: bool) -> Result<u64, ChatError> {
        let mut tables = self.tables.write().await;
        if !tables.rooms.contains_key(&room_id) {
            return Err(ChatError::NotFound("Room".to_string()));
        }

        let mut updated = 0;
        for message in tables
            .messages
            .iter_mut()
            .filter(|m| m.room_id == room_id && m.author_is_staff != reader_is_staff && !m.is_read)
        {
            message.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn list_messages(
        &self,
        room_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MessageView>, ChatError> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|m| {
                let author = tables.users.get(&m.author_id)?;
                Some(MessageView {
                    message: m.clone(),
                    author_email: author.email.clone(),
                    author_avatar: author.avatar_or_empty(),
                })
            })
            .collect())
    }

    async fn count_messages(&self, room_id: Uuid) -> Result<i64, ChatError> {
        let tables = self.tables.read().await;
        Ok(tables.messages.iter().filter(|m| m.room_id == room_id).count() as i64)
    }

    async fn unread_count(&self, room_id: Uuid, for_staff: bool) -> Result<i64, ChatError> {
        Ok(self.tables.read().await.unread(Some(room_id), !for_staff))
    }

    async fn unread_total_for_staff(&self) -> Result<i64, ChatError> {
        Ok(self.tables.read().await.unread(None, false))
    }

    async fn list_active_rooms(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RoomSummary>, ChatError> {
        let tables = self.tables.read().await;
        Ok(tables
            .active_rooms(search)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_active_rooms(&self, search: Option<&str>) -> Result<i64, ChatError> {
        Ok(self.tables.read().await.active_rooms(search).len() as i64)
    }

    async fn set_room_active(&self, room_id: Uuid, is_active: bool) -> Result<ChatRoom, ChatError> {
        let mut tables = self.tables.write().await;
        let room = tables
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| ChatError::NotFound("Room".to_string()))?;
        room.is_active = is_active;
        Ok(room.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn customer(email: &str) -> ChatUser {
        ChatUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_staff: false,
            avatar_url: None,
        }
    }

    pub(crate) fn staff(email: &str) -> ChatUser {
        ChatUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_staff: true,
            avatar_url: Some("/media/avatars/staff.png".to_string()),
        }
    }

    async fn store_with(users: &[&ChatUser]) -> MemoryChatStore {
        let store = MemoryChatStore::new();
        for user in users {
            store.upsert_user((*user).clone()).await;
        }
        store
    }

    #[tokio::test]
    async fn get_or_create_room_is_idempotent() {
        let alice = customer("alice@example.com");
        let store = store_with(&[&alice]).await;

        let (first, created) = store.get_or_create_room(&alice).await.unwrap();
        assert!(created);
        assert_eq!(first.title, "Support - alice@example.com");
        assert!(first.is_active);

        let (second, created) = store.get_or_create_room(&alice).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn posting_updates_last_activity() {
        let alice = customer("alice@example.com");
        let store = store_with(&[&alice]).await;
        let (room, _) = store.get_or_create_room(&alice).await.unwrap();

        let message = store.post_message(room.id, &alice, "hello").await.unwrap();
        let room = store.find_room(room.id).await.unwrap().unwrap();

        assert_eq!(room.last_activity, message.created_at);
        assert!(!message.is_read);
        assert!(!message.author_is_staff);
    }

    #[tokio::test]
    async fn posting_to_missing_room_is_not_found() {
        let alice = customer("alice@example.com");
        let store = store_with(&[&alice]).await;

        let err = store.post_message(Uuid::new_v4(), &alice, "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
        let err = store.mark_read(Uuid::new_v4(), false).await.unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }

    #[tokio::test]
    async fn mark_read_only_flips_the_other_party() {
        let alice = customer("alice@example.com");
        let bob = staff("bob@shop.example");
        let store = store_with(&[&alice, &bob]).await;
        let (room, _) = store.get_or_create_room(&alice).await.unwrap();

        store.post_message(room.id, &alice, "my fern is dying").await.unwrap();
        store.post_message(room.id, &bob, "water it less").await.unwrap();
        store.post_message(room.id, &bob, "and more light").await.unwrap();

        assert_eq!(store.mark_read(room.id, false).await.unwrap(), 2);
        assert_eq!(store.unread_count(room.id, false).await.unwrap(), 0);
        assert_eq!(store.unread_count(room.id, true).await.unwrap(), 1);

        let views = store.list_messages(room.id, 0, 50).await.unwrap();
        let customer_message = views.iter().find(|v| v.message.author_id == alice.id).unwrap();
        assert!(!customer_message.message.is_read);

        assert_eq!(store.mark_read(room.id, false).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn staff_total_spans_rooms() {
        let alice = customer("alice@example.com");
        let carol = customer("carol@example.com");
        let store = store_with(&[&alice, &carol]).await;
        let (a, _) = store.get_or_create_room(&alice).await.unwrap();
        let (c, _) = store.get_or_create_room(&carol).await.unwrap();

        store.post_message(a.id, &alice, "one").await.unwrap();
        store.post_message(c.id, &carol, "two").await.unwrap();
        store.post_message(c.id, &carol, "three").await.unwrap();

        assert_eq!(store.unread_total_for_staff().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn active_rooms_are_searchable_and_sorted_by_activity() {
        let alice = customer("alice@example.com");
        let carol = customer("carol@example.com");
        let store = store_with(&[&alice, &carol]).await;
        let (a, _) = store.get_or_create_room(&alice).await.unwrap();
        let (c, _) = store.get_or_create_room(&carol).await.unwrap();
        store.post_message(a.id, &alice, "first").await.unwrap();
        store.post_message(c.id, &carol, "latest").await.unwrap();

        let rooms = store.list_active_rooms(None, 0, 20).await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].room.id, c.id);
        assert_eq!(rooms[0].unread_count, 1);

        let rooms = store.list_active_rooms(Some("ALICE"), 0, 20).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].user_email, "alice@example.com");

        store.set_room_active(c.id, false).await.unwrap();
        assert_eq!(store.count_active_rooms(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_a_room_removes_its_messages() {
        let alice = customer("alice@example.com");
        let store = store_with(&[&alice]).await;
        let (room, _) = store.get_or_create_room(&alice).await.unwrap();
        store.post_message(room.id, &alice, "hello").await.unwrap();

        store.delete_room(room.id).await;

        assert!(store.find_room(room.id).await.unwrap().is_none());
        assert_eq!(store.count_messages(room.id).await.unwrap(), 0);
        assert!(store.find_room_by_user(alice.id).await.unwrap().is_none());
    }
}
