use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::ChatError,
    middleware::auth_middleware::CurrentUser,
    models::{
        chat::{
            ChatRoom, MarkReadRequest, MarkReadResponse, NotificationResponse, PageQuery,
            RoomDetail, RoomList, RoomListQuery, SetActiveRequest,
        },
        message::{ChatMessage, SendMessageRequest},
    },
};

/// The caller's own support room, opened on first visit.
pub async fn user_chat_room(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<RoomDetail>, ChatError> {
    let (room, _) = state.chat.open_room(&user).await?;
    let detail = state.chat.history(&user, room.id, query.page).await?;
    Ok(Json(detail))
}

pub async fn send_user_message(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ChatError> {
    payload.validate()?;
    let message = state.chat.post_to_own_room(&user, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn chat_notifications(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<NotificationResponse>, ChatError> {
    let unread_count = state.chat.notifications(&user).await?;
    Ok(Json(NotificationResponse { unread_count }))
}

pub async fn mark_messages_read(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ChatError> {
    let updated = state.chat.mark_read(&user, payload.room_id).await?;
    Ok(Json(MarkReadResponse {
        success: true,
        updated,
    }))
}

pub async fn admin_chat_list(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<RoomListQuery>,
) -> Result<Json<RoomList>, ChatError> {
    let list = state
        .chat
        .admin_rooms(&user, query.search.as_deref(), query.page)
        .await?;
    Ok(Json(list))
}

pub async fn admin_chat_room(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<RoomDetail>, ChatError> {
    let detail = state.chat.admin_history(&user, room_id, query.page).await?;
    Ok(Json(detail))
}

pub async fn admin_reply(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ChatError> {
    payload.validate()?;
    let message = state.chat.admin_reply(&user, room_id, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn set_room_active(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<ChatRoom>, ChatError> {
    let room = state
        .chat
        .set_room_active(&user, room_id, payload.is_active)
        .await?;
    Ok(Json(room))
}
