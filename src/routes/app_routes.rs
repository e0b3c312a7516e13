// src/routes/app_routes.rs

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::handlers::chat_handlers::{
    admin_chat_list, admin_chat_room, admin_reply, chat_notifications, mark_messages_read,
    send_user_message, set_room_active, user_chat_room,
};
use crate::middleware::auth_middleware::auth_middleware;
use crate::middleware::ws_auth_middleware::ws_auth_middleware;
use crate::websocket::handlers::websocket_handler;

pub fn create_router(state: AppState) -> Router {
    let chat = Router::new()
        .route("/chat", get(user_chat_room))
        .route("/chat/messages", post(send_user_message))
        .route("/chat/notifications", get(chat_notifications))
        .route("/chat/mark-read", post(mark_messages_read))
        .route("/chat/admin/rooms", get(admin_chat_list))
        .route("/chat/admin/rooms/:room_id", get(admin_chat_room))
        .route("/chat/admin/rooms/:room_id/messages", post(admin_reply))
        .route("/chat/admin/rooms/:room_id/active", post(set_room_active))
        .route_layer(from_fn(auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/ws/chat/:room_id",
            get(websocket_handler).route_layer(from_fn(ws_auth_middleware)),
        )
        .merge(chat)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
