use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::friend::model::RelationKind;
use crate::modules::user::schema::UserEntity;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    #[validate(length(min = 2, max = 32, message = "Username must be 2-32 characters long"))]
    pub username: String,
    #[validate(length(min = 2, max = 50, message = "Display name must be 2-50 characters long"))]
    pub display_name: String,
}

#[derive(Deserialize, Validate)]
pub struct SignInModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileModel {
    #[validate(length(min = 2, max = 50, message = "Display name must be 2-50 characters long"))]
    pub display_name: Option<String>,
    #[validate(length(max = 512, message = "Avatar URL too long"))]
    pub avatar_url: Option<String>,
}

pub struct InsertUser {
    pub email: String,
    pub username: String,
    pub hash_password: String,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserEntity> for UserResponse {
    fn from(entity: UserEntity) -> Self {
        UserResponse {
            id: entity.id,
            email: entity.email,
            username: entity.username,
            display_name: entity.display_name,
            avatar_url: entity.avatar_url,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// The profile slice attached to messages, room members and friend lists.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserBrief {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<&UserEntity> for UserBrief {
    fn from(entity: &UserEntity) -> Self {
        UserBrief {
            id: entity.id,
            display_name: entity.display_name.clone(),
            avatar_url: entity.avatar_url.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Deserialize, Validate)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<i64>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub relation: RelationKind,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
}
