use uuid::Uuid;

use crate::{
    api::error,
    modules::user::model::{InsertUser, UpdateProfileModel},
    modules::user::schema::UserEntity,
};

#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError>;

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError>;

    async fn create(&self, user: &InsertUser) -> Result<UserEntity, error::SystemError>;

    async fn update_profile(
        &self,
        id: &Uuid,
        changes: &UpdateProfileModel,
    ) -> Result<UserEntity, error::SystemError>;

    /// Case-insensitive partial match on display name or email, excluding
    /// the caller. Deterministic order by display name.
    async fn search(
        &self,
        query: &str,
        exclude: &Uuid,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError>;
}
