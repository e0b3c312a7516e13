use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shop account as seen by the chat: the host application owns the
/// record, the chat only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: Uuid,
    pub email: String,
    pub is_staff: bool,
    /// Public URL of the profile picture, if the user uploaded one.
    pub avatar_url: Option<String>,
}

impl ChatUser {
    /// Avatar URL as sent over the wire, empty when the user has none.
    pub fn avatar_or_empty(&self) -> String {
        self.avatar_url.clone().unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}
