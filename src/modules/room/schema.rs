use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "room_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomType {
    Direct,
    Group,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "room_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomRole {
    Owner,
    Member,
}

#[derive(Debug, Clone, FromRow)]
pub struct RoomEntity {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub _type: RoomType,
    pub name: Option<String>,
    pub direct_key: Option<String>,
    pub created_by: Uuid,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
