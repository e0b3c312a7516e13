use tokio_postgres::Client;

// Statements are idempotent and run in order on every start.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "users",
        // Owned by the host application; created here only so a fresh
        // database can serve the chat on its own.
        "CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            email VARCHAR(255) NOT NULL UNIQUE,
            is_staff BOOLEAN NOT NULL DEFAULT FALSE,
            avatar_url TEXT
        )",
    ),
    (
        "chat_rooms",
        "CREATE TABLE IF NOT EXISTS chat_rooms (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            title VARCHAR(200) NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            last_activity TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "chat_messages",
        "CREATE TABLE IF NOT EXISTS chat_messages (
            id UUID PRIMARY KEY,
            room_id UUID NOT NULL REFERENCES chat_rooms(id) ON DELETE CASCADE,
            author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            author_is_staff BOOLEAN NOT NULL,
            content TEXT NOT NULL,
            is_read BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "chat_messages_room_created_idx",
        "CREATE INDEX IF NOT EXISTS chat_messages_room_created_idx
            ON chat_messages (room_id, created_at)",
    ),
    (
        "chat_messages_unread_idx",
        "CREATE INDEX IF NOT EXISTS chat_messages_unread_idx
            ON chat_messages (room_id, author_is_staff) WHERE is_read = FALSE",
    ),
    (
        "chat_rooms_activity_idx",
        "CREATE INDEX IF NOT EXISTS chat_rooms_activity_idx
            ON chat_rooms (last_activity DESC) WHERE is_active = TRUE",
    ),
];

// This function applies database migrations, creating the chat tables and indexes.
pub async fn apply_migrations(client: &Client) -> Result<(), String> {
    for (name, statement) in MIGRATIONS {
        client
            .execute(*statement, &[])
            .await
            .map_err(|e| format!("Error applying migration {}: {}", name, e))?;
        tracing::debug!("Migration {} applied", name);
    }

    Ok(())
}
