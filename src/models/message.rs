use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Upper bound on message length, in characters.
pub const MESSAGE_MAX_CHARS: usize = 4000;

/// A single chat utterance. Only `is_read` ever changes after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub author_id: Uuid,
    pub author_is_staff: bool,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A message joined with the public part of its author, for history pages.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub author_email: String,
    pub author_avatar: String,
}

#[derive(Deserialize, Validate, Debug)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "A message must be between 1 and 4000 characters long"))]
    pub content: String,
}
