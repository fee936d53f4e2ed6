use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "friend_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Blocked,
}

/// One row per unordered user pair. `user_a < user_b` always holds; who
/// initiated is recorded separately in `requested_by`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FriendEntity {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub status: FriendStatus,
    pub requested_by: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl FriendEntity {
    /// The counterpart of `me` in this relation.
    pub fn other(&self, me: &Uuid) -> Uuid {
        if self.user_a == *me {
            self.user_b
        } else {
            self.user_a
        }
    }
}
