use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::MessageView;
use crate::utils::pagination::{lenient_page, PageInfo};

pub const ROOM_TITLE_MAX_LEN: usize = 200;

/// One customer's support conversation with staff.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatRoom {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ChatRoom {
    pub fn default_title(email: &str) -> String {
        let title = format!("Support - {}", email);
        title.chars().take(ROOM_TITLE_MAX_LEN).collect()
    }

    /// Owners and staff may read and write a room.
    pub fn is_accessible_by(&self, user_id: Uuid, is_staff: bool) -> bool {
        is_staff || self.user_id == user_id
    }
}

/// Row of the staff room list.
#[derive(Serialize, Debug, Clone)]
pub struct RoomSummary {
    #[serde(flatten)]
    pub room: ChatRoom,
    pub user_email: String,
    pub unread_count: i64,
}

#[derive(Serialize, Debug)]
pub struct RoomDetail {
    pub room: ChatRoom,
    pub messages: Vec<MessageView>,
    pub page: PageInfo,
    pub unread_for_user: i64,
    pub unread_for_staff: i64,
}

#[derive(Serialize, Debug)]
pub struct RoomList {
    pub rooms: Vec<RoomSummary>,
    pub search: String,
    pub page: PageInfo,
}

#[derive(Deserialize, Debug, Default)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RoomListQuery {
    pub search: Option<String>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct MarkReadRequest {
    pub room_id: Uuid,
}

#[derive(Serialize, Debug)]
pub struct MarkReadResponse {
    pub success: bool,
    pub updated: u64,
}

#[derive(Deserialize, Debug)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Serialize, Debug)]
pub struct NotificationResponse {
    pub unread_count: i64,
}
