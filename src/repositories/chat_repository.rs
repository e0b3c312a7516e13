// repositories/chat_repository.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tracing::debug;
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

const ROOM_COLUMNS: &str = "r.id, r.user_id, r.title, r.is_active, r.created_at, r.last_activity";

/// PostgreSQL backed chat store.
#[derive(Clone)]
pub struct PgChatStore {
    pool: Pool,
}

impl PgChatStore {
    pub fn new(pool: Pool) -> Self {
        PgChatStore { pool }
    }
}

fn room_from_row(row: &Row) -> ChatRoom {
    ChatRoom {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        last_activity: row.get("last_activity"),
    }
}

fn message_from_row(row: &Row) -> ChatMessage {
    ChatMessage {
        id: row.get("id"),
        room_id: row.get("room_id"),
        author_id: row.get("author_id"),
        author_is_staff: row.get("author_is_staff"),
        content: row.get("content"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}

/// `ILIKE` pattern matching `search` anywhere, with wildcards in the input escaped.
fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let escaped = s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            format!("%{}%", escaped)
        })
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<ChatUser>, ChatError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, email, is_staff, avatar_url FROM users WHERE id = $1",
                &[&user_id],
            )
            .await?;

        Ok(row.map(|row| ChatUser {
            id: row.get("id"),
            email: row.get("email"),
            is_staff: row.get("is_staff"),
            avatar_url: row.get("avatar_url"),
        }))
    }

    async fn get_or_create_room(&self, user: &ChatUser) -> Result<(ChatRoom, bool), ChatError> {
        let client = self.pool.get().await?;

        let insert = format!(
            "INSERT INTO chat_rooms AS r (id, user_id, title)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO NOTHING
             RETURNING {}",
            ROOM_COLUMNS
        );
        let title = ChatRoom::default_title(&user.email);
        if let Some(row) = client
            .query_opt(insert.as_str(), &[&Uuid::new_v4(), &user.id, &title])
            .await?
        {
            debug!("Created support room for user {}", user.id);
            return Ok((room_from_row(&row), true));
        }

        let select = format!("SELECT {} FROM chat_rooms r WHERE r.user_id = $1", ROOM_COLUMNS);
        let row = client.query_one(select.as_str(), &[&user.id]).await?;
        Ok((room_from_row(&row), false))
    }

    async fn find_room(&self, room_id: Uuid) -> Result<Option<ChatRoom>, ChatError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {} FROM chat_rooms r WHERE r.id = $1", ROOM_COLUMNS);
        let row = client.query_opt(query.as_str(), &[&room_id]).await?;
        Ok(row.as_ref().map(room_from_row))
    }

    async fn find_room_by_user(&self, user_id: Uuid) -> Result<Option<ChatRoom>, ChatError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {} FROM chat_rooms r WHERE r.user_id = $1", ROOM_COLUMNS);
        let row = client.query_opt(query.as_str(), &[&user_id]).await?;
        Ok(row.as_ref().map(room_from_row))
    }

    async fn post_message(
        &self,
        room_id: Uuid,
        author: &ChatUser,
        content: &str,
    ) -> Result<ChatMessage, ChatError> {
        let mut client = self.pool.get().await?;
        let transaction = client.transaction().await?;
        let created_at: DateTime<Utc> = Utc::now();

        let touched = transaction
            .execute(
                "UPDATE chat_rooms SET last_activity = $2 WHERE id = $1",
                &[&room_id, &created_at],
            )
            .await?;
        if touched == 0 {
            return Err(ChatError::NotFound("Room".to_string()));
        }

        let row = transaction
            .query_one(
                "INSERT INTO chat_messages (id, room_id, author_id, author_is_staff, content, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id, room_id, author_id, author_is_staff, content, is_read, created_at",
                &[&Uuid::new_v4(), &room_id, &author.id, &author.is_staff, &content, &created_at],
            )
            .await?;

        transaction.commit().await?;
        Ok(message_from_row(&row))
    }

    async fn mark_read(&self, room_id: Uuid, reader_is_staff: bool) -> Result<u64, ChatError> {
        let client = self.pool.get().await?;

        if client
            .query_opt("SELECT 1 FROM chat_rooms WHERE id = $1", &[&room_id])
            .await?
            .is_none()
        {
            return Err(ChatError::NotFound("Room".to_string()));
        }

        let author_is_staff = !reader_is_staff;
        let updated = client
            .execute(
                "UPDATE chat_messages SET is_read = TRUE
                 WHERE room_id = $1 AND author_is_staff = $2 AND is_read = FALSE",
                &[&room_id, &author_is_staff],
            )
            .await?;
        Ok(updated)
    }

    async fn list_messages(
        &self,
        room_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MessageView>, ChatError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT m.id, m.room_id, m.author_id, m.author_is_staff, m.content, m.is_read,
                        m.created_at, u.email, u.avatar_url
                 FROM chat_messages m
                 JOIN users u ON u.id = m.author_id
                 WHERE m.room_id = $1
                 ORDER BY m.created_at, m.id
                 OFFSET $2 LIMIT $3",
                &[&room_id, &offset, &limit],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| MessageView {
                message: message_from_row(row),
                author_email: row.get("email"),
                author_avatar: row.get::<_, Option<String>>("avatar_url").unwrap_or_default(),
            })
            .collect())
    }

    async fn count_messages(&self, room_id: Uuid) -> Result<i64, ChatError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one("SELECT COUNT(*) FROM chat_messages WHERE room_id = $1", &[&room_id])
            .await?;
        Ok(row.get(0))
    }

    async fn unread_count(&self, room_id: Uuid, for_staff: bool) -> Result<i64, ChatError> {
        let client = self.pool.get().await?;
        let author_is_staff = !for_staff;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM chat_messages
                 WHERE room_id = $1 AND author_is_staff = $2 AND is_read = FALSE",
                &[&room_id, &author_is_staff],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn unread_total_for_staff(&self) -> Result<i64, ChatError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM chat_messages WHERE author_is_staff = FALSE AND is_read = FALSE",
                &[],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn list_active_rooms(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RoomSummary>, ChatError> {
        let client = self.pool.get().await?;
        let pattern = search_pattern(search);
        let query = format!(
            "SELECT {}, u.email,
                    (SELECT COUNT(*) FROM chat_messages m
                     WHERE m.room_id = r.id AND m.author_is_staff = FALSE AND m.is_read = FALSE) AS unread_count
             FROM chat_rooms r
             JOIN users u ON u.id = r.user_id
             WHERE r.is_active = TRUE
               AND ($1::text IS NULL OR u.email ILIKE $1 OR r.title ILIKE $1)
             ORDER BY r.last_activity DESC
             OFFSET $2 LIMIT $3",
            ROOM_COLUMNS
        );
        let rows = client.query(query.as_str(), &[&pattern, &offset, &limit]).await?;

        Ok(rows
            .iter()
            .map(|row| RoomSummary {
                room: room_from_row(row),
                user_email: row.get("email"),
                unread_count: row.get("unread_count"),
            })
            .collect())
    }

    async fn count_active_rooms(&self, search: Option<&str>) -> Result<i64, ChatError> {
        let client = self.pool.get().await?;
        let pattern = search_pattern(search);
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM chat_rooms r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.is_active = TRUE
                   AND ($1::text IS NULL OR u.email ILIKE $1 OR r.title ILIKE $1)",
                &[&pattern],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn set_room_active(&self, room_id: Uuid, is_active: bool) -> Result<ChatRoom, ChatError> {
        let client = self.pool.get().await?;
        let query = format!(
            "UPDATE chat_rooms AS r SET is_active = $2 WHERE r.id = $1 RETURNING {}",
            ROOM_COLUMNS
        );
        client
            .query_opt(query.as_str(), &[&room_id, &is_active])
            .await?
            .as_ref()
            .map(room_from_row)
            .ok_or_else(|| ChatError::NotFound("Room".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init::init_db;

    /// Store against the database in `DATABASE_URL`; `None` skips the test.
    async fn live_store() -> Option<PgChatStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(PgChatStore::new(init_db(&url).await.unwrap()))
    }

    async fn insert_user(store: &PgChatStore, is_staff: bool) -> ChatUser {
        let id = Uuid::new_v4();
        let user = ChatUser {
            id,
            email: format!("{}@chat-test.example", id),
            is_staff,
            avatar_url: None,
        };
        let client = store.pool.get().await.unwrap();
        client
            .execute(
                "INSERT INTO users (id, email, is_staff, avatar_url) VALUES ($1, $2, $3, $4)",
                &[&user.id, &user.email, &user.is_staff, &user.avatar_url],
            )
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_get_or_create_room_is_idempotent() {
        let store = match live_store().await {
            Some(store) => store,
            None => return,
        };
        let alice = insert_user(&store, false).await;

        let (first, created) = store.get_or_create_room(&alice).await.unwrap();
        assert!(created);
        let (second, created) = store.get_or_create_room(&alice).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(first.title, format!("Support - {}", alice.email));
        assert_eq!(store.find_room_by_user(alice.id).await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_post_message_moves_last_activity() {
        let store = match live_store().await {
            Some(store) => store,
            None => return,
        };
        let alice = insert_user(&store, false).await;
        let (room, _) = store.get_or_create_room(&alice).await.unwrap();

        let message = store.post_message(room.id, &alice, "hello").await.unwrap();
        let room = store.find_room(room.id).await.unwrap().unwrap();
        assert_eq!(room.last_activity, message.created_at);
        assert!(!message.is_read);

        let err = store.post_message(Uuid::new_v4(), &alice, "nobody home").await.unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_mark_read_flips_only_the_other_party() {
        let store = match live_store().await {
            Some(store) => store,
            None => return,
        };
        let alice = insert_user(&store, false).await;
        let bob = insert_user(&store, true).await;
        let (room, _) = store.get_or_create_room(&alice).await.unwrap();
        let staff_before = store.unread_total_for_staff().await.unwrap();

        store.post_message(room.id, &alice, "my fern is brown").await.unwrap();
        store.post_message(room.id, &bob, "water less").await.unwrap();
        store.post_message(room.id, &bob, "and move it").await.unwrap();

        assert_eq!(store.unread_count(room.id, false).await.unwrap(), 2);
        assert_eq!(store.unread_count(room.id, true).await.unwrap(), 1);
        assert_eq!(store.unread_total_for_staff().await.unwrap(), staff_before + 1);

        assert_eq!(store.mark_read(room.id, false).await.unwrap(), 2);
        assert_eq!(store.unread_count(room.id, false).await.unwrap(), 0);
        assert_eq!(store.unread_count(room.id, true).await.unwrap(), 1);
        assert_eq!(store.mark_read(room.id, false).await.unwrap(), 0);

        let views = store.list_messages(room.id, 0, 50).await.unwrap();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].message.content, "my fern is brown");
        assert_eq!(views[0].author_avatar, "");
        assert_eq!(store.count_messages(room.id).await.unwrap(), 3);

        let err = store.mark_read(Uuid::new_v4(), true).await.unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn pg_active_rooms_carry_staff_unread_counts() {
        let store = match live_store().await {
            Some(store) => store,
            None => return,
        };
        let alice = insert_user(&store, false).await;
        let (room, _) = store.get_or_create_room(&alice).await.unwrap();
        store.post_message(room.id, &alice, "one").await.unwrap();
        store.post_message(room.id, &alice, "two").await.unwrap();

        let search = alice.id.to_string();
        assert_eq!(store.count_active_rooms(Some(&search)).await.unwrap(), 1);
        let rooms = store.list_active_rooms(Some(&search), 0, 20).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room.id, room.id);
        assert_eq!(rooms[0].user_email, alice.email);
        assert_eq!(rooms[0].unread_count, 2);

        let room = store.set_room_active(room.id, false).await.unwrap();
        assert!(!room.is_active);
        assert_eq!(store.count_active_rooms(Some(&search)).await.unwrap(), 0);
        assert!(store.list_active_rooms(Some(&search), 0, 20).await.unwrap().is_empty());
    }

    #[test]
    fn search_pattern_wraps_and_escapes() {
        assert_eq!(search_pattern(Some("ann")), Some("%ann%".to_string()));
        assert_eq!(search_pattern(Some(" 50%_off ")), Some("%50\\%\\_off%".to_string()));
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(None), None);
    }
}
