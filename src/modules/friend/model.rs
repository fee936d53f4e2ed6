use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::user::schema::UserEntity;

/// Relationship of a searched user to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Accepted,
    PendingIn,
    PendingOut,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FriendDirection {
    Outgoing,
    Incoming,
}

/// Outcome of a request/accept/decline action as reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FriendActionStatus {
    Pending,
    Accepted,
    Declined,
    Canceled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendActionResponse {
    pub status: FriendActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<FriendDirection>,
}

#[derive(Deserialize, Validate)]
pub struct UsernameBody {
    #[validate(length(min = 2, max = 32, message = "Username must be 2-32 characters long"))]
    pub username: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl From<&UserEntity> for FriendProfile {
    fn from(user: &UserEntity) -> Self {
        FriendProfile {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendListResponse {
    pub accepted: Vec<FriendProfile>,
    pub pending_incoming: Vec<FriendProfile>,
    pub pending_outgoing: Vec<FriendProfile>,
}
