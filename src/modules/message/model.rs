use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::user::model::UserBrief;

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<Uuid>,
}

/// A message row joined with its sender's profile, straight off the store.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRecord {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub edited_at: Option<chrono::DateTime<chrono::Utc>>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub sender_display_name: String,
    pub sender_avatar_url: Option<String>,
}

impl MessageRecord {
    pub fn sender_brief(&self) -> UserBrief {
        UserBrief {
            id: self.sender_id,
            display_name: self.sender_display_name.clone(),
            avatar_url: self.sender_avatar_url.clone(),
        }
    }
}

/// HTTP shape of a message, sender profile nested.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub room_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub edited_at: Option<chrono::DateTime<chrono::Utc>>,
    pub sender: UserBrief,
}

impl From<&MessageRecord> for MessageView {
    fn from(record: &MessageRecord) -> Self {
        MessageView {
            id: record.id,
            room_id: record.room_id,
            content: record.content.clone(),
            reply_to_id: record.reply_to_id,
            created_at: record.created_at,
            edited_at: record.edited_at,
            sender: record.sender_brief(),
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct PageQuery {
    #[validate(range(min = 1, message = "Limit must be positive"))]
    pub limit: Option<i64>,
    pub cursor: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub items: Vec<MessageView>,
    pub next_cursor: Option<Uuid>,
}
