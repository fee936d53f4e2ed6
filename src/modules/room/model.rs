use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::message::model::MessageView;
use crate::modules::room::schema::{RoomEntity, RoomRole, RoomType};
use crate::modules::user::model::UserBrief;

/// Canonical identity of a direct room: the two participant ids sorted and
/// joined, so both orderings map to the same unique key.
pub fn direct_key_for(user_id_a: &Uuid, user_id_b: &Uuid) -> String {
    let (a, b) =
        if user_id_a <= user_id_b { (user_id_a, user_id_b) } else { (user_id_b, user_id_a) };
    format!("{a}:{b}")
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DirectRoomBody {
    pub peer_id: Uuid,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupBody {
    #[validate(length(min = 1, max = 100, message = "Room name must be 1-100 characters long"))]
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomScope {
    Recent,
    All,
}

impl RoomScope {
    /// Anything that is not explicitly `all` lists recent rooms, matching
    /// the default of the HTTP query parameter.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("all") => RoomScope::All,
            _ => RoomScope::Recent,
        }
    }
}

#[derive(Deserialize)]
pub struct ListRoomsQuery {
    pub scope: Option<String>,
}

/// A room row joined with the caller's own membership watermark.
#[derive(Debug, Clone, FromRow)]
pub struct RoomListRow {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub _type: RoomType,
    pub name: Option<String>,
    pub created_by: Uuid,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_read_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A membership row joined with the member's profile.
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub role: RoomRole,
    pub last_read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl MemberRow {
    pub fn brief(&self) -> UserBrief {
        UserBrief {
            id: self.user_id,
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberView {
    pub user: UserBrief,
    pub role: RoomRole,
    pub last_read_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&MemberRow> for RoomMemberView {
    fn from(row: &MemberRow) -> Self {
        RoomMemberView { user: row.brief(), role: row.role, last_read_at: row.last_read_at }
    }
}

/// A room plus its membership list, as returned by the create endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetail {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub _type: RoomType,
    pub name: Option<String>,
    pub created_by: Uuid,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub members: Vec<RoomMemberView>,
}

impl RoomDetail {
    pub fn from_parts(room: RoomEntity, members: &[MemberRow]) -> Self {
        RoomDetail {
            id: room.id,
            _type: room._type,
            name: room.name,
            created_by: room.created_by,
            last_message_at: room.last_message_at,
            created_at: room.created_at,
            members: members.iter().map(RoomMemberView::from).collect(),
        }
    }
}

/// One entry of `GET /rooms`: the room, its members, the latest visible
/// message, the caller's unread count and (for DMs) the counterpart profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub _type: RoomType,
    pub name: Option<String>,
    pub created_by: Uuid,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub members: Vec<RoomMemberView>,
    pub last_message: Option<MessageView>,
    pub unread_count: i64,
    pub other_user: Option<UserBrief>,
}
