use serde::Serialize;
use serde_json::Value;

use crate::models::{message::ChatMessage, user::ChatUser};

/// Frames a client may send over the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Message { message: String },
    Typing { is_typing: bool },
}

impl ClientFrame {
    /// Parses an inbound text frame. Anything that is not valid JSON, has an
    /// unknown `type` or carries a blank message yields `None`. A missing
    /// `type` is read as `"message"`.
    pub fn parse(text: &str) -> Option<ClientFrame> {
        let value: Value = serde_json::from_str(text).ok()?;
        let object = value.as_object()?;

        match object.get("type").map(Value::as_str) {
            None | Some(Some("message")) => {
                let message = object.get("message").and_then(Value::as_str).unwrap_or("");
                if message.trim().is_empty() {
                    return None;
                }
                Some(ClientFrame::Message {
                    message: message.to_string(),
                })
            }
            Some(Some("typing")) => Some(ClientFrame::Typing {
                is_typing: object.get("is_typing").and_then(Value::as_bool).unwrap_or(false),
            }),
            _ => None,
        }
    }
}

/// Events fanned out to every connection of a room.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    Message {
        message: String,
        author_email: String,
        author_avatar: String,
        created_at: String,
        is_staff: bool,
    },
    Typing {
        user_email: String,
        is_typing: bool,
    },
}

impl ServerEvent {
    pub fn chat_message(message: &ChatMessage, author: &ChatUser) -> Self {
        ServerEvent::Message {
            message: message.content.clone(),
            author_email: author.email.clone(),
            author_avatar: author.avatar_or_empty(),
            created_at: message.created_at.format("%H:%M").to_string(),
            is_staff: author.is_staff,
        }
    }

    pub fn typing(user: &ChatUser, is_typing: bool) -> Self {
        ServerEvent::Typing {
            user_email: user.email.clone(),
            is_typing,
        }
    }
}
