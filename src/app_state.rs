// app_state.rs

use std::sync::Arc;

use crate::services::chat_service::ChatService;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Chat operations, including the WebSocket connection registry
    pub chat: ChatService,
    /// Secret used to validate bearer tokens issued by the shop
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Creates a new instance of AppState
    ///
    /// # Arguments
    /// * `chat` - Chat service built at startup
    /// * `jwt_secret` - HS256 secret shared with the token issuer
    pub fn new(chat: ChatService, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            chat,
            jwt_secret: jwt_secret.into(),
        }
    }
}
