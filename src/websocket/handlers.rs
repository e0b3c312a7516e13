use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    app_state::AppState, middleware::auth_middleware::CurrentUser, models::user::ChatUser,
    services::chat_service::ChatService,
};

use super::types::ClientFrame;

// Handles the WebSocket upgrade request for a support room
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, state.chat, room_id, user))
}

// Handles the WebSocket connection once it has been upgraded
async fn handle_websocket_connection(
    mut socket: WebSocket,
    chat: ChatService,
    room_id: Uuid,
    user: ChatUser,
) {
    let mut connection = match chat.join(&user, room_id).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!("Closing socket of user {} for room {}: {}", user.id, room_id, e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    info!(
        "User {} connected to room {} ({} connections)",
        user.email,
        room_id,
        chat.connections().connection_count(room_id)
    );

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_client_frame(&chat, &user, room_id, &text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error for user {}: {}", user.id, e);
                        break;
                    }
                }
            }
            event = connection.receiver.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("Failed to encode event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(payload)).await {
                    warn!("Failed to send to user {}: {}", user.id, e);
                    break;
                }
            }
        }
    }

    chat.leave(&connection);
    info!("User {} left room {}", user.email, room_id);
}

// Malformed frames are dropped and the socket stays open
async fn handle_client_frame(chat: &ChatService, user: &ChatUser, room_id: Uuid, text: &str) {
    match ClientFrame::parse(text) {
        Some(ClientFrame::Message { message }) => {
            if let Err(e) = chat.send_message(user, room_id, &message).await {
                error!("Dropping message from user {} in room {}: {}", user.id, room_id, e);
            }
        }
        Some(ClientFrame::Typing { is_typing }) => {
            if let Err(e) = chat.send_typing(user, room_id, is_typing) {
                error!("Failed to broadcast typing state: {}", e);
            }
        }
        None => debug!("Ignoring malformed frame from user {}", user.id),
    }
}
