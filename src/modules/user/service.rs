use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::configs::RedisCache;
use crate::modules::user::model::{
    InsertUser, SignInModel, SignUpModel, UpdateProfileModel, UserResponse,
};
use crate::modules::user::repository::UserRepository;
use crate::modules::user::schema::UserEntity;
use crate::utils::{hash_password, verify_password, Claims, TypeClaims};
use crate::ENV;

const REFRESH_KEY_PREFIX: &str = "refresh_token:";
const USER_CACHE_TTL: usize = 3600;

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    cache: Arc<RedisCache>,
}

impl UserService {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        cache: Arc<RedisCache>,
    ) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo, cache }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<UserResponse, error::SystemError> {
        let key = format!("user:{}", id);
        if let Some(cached_user) = self.cache.get::<UserResponse>(&key).await? {
            return Ok(cached_user);
        }
        let user_entity = self.repo.find_by_id(&id).await?;
        if let Some(entity) = user_entity {
            let response = UserResponse::from(entity);
            self.cache.set(&key, &response, USER_CACHE_TTL).await?;
            Ok(response)
        } else {
            Err(error::SystemError::not_found("User not found"))
        }
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        changes: UpdateProfileModel,
    ) -> Result<UserResponse, error::SystemError> {
        if changes.display_name.is_none() && changes.avatar_url.is_none() {
            return Err(error::SystemError::bad_request("No fields to update"));
        }

        let updated = self.repo.update_profile(&id, &changes).await?;

        self.cache.delete(&format!("user:{}", id)).await?;
        Ok(UserResponse::from(updated))
    }

    pub async fn sign_up(
        &self,
        user: SignUpModel,
    ) -> Result<(String, String, UserResponse), error::SystemError> {
        let hash_password = hash_password(&user.password)?;

        let new_user = InsertUser {
            email: user.email,
            username: user.username.to_lowercase(),
            hash_password,
            display_name: user.display_name,
        };

        // Duplicate email/username surfaces as a unique violation, which the
        // error layer maps to Conflict.
        let entity = self.repo.create(&new_user).await?;
        let (access_token, refresh_token) = self.issue_tokens(&entity.id).await?;

        Ok((access_token, refresh_token, UserResponse::from(entity)))
    }

    pub async fn sign_in(
        &self,
        user: SignInModel,
    ) -> Result<(String, String, UserResponse), error::SystemError> {
        let user_entity = self
            .repo
            .find_by_email(&user.email)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Invalid email or password"))?;

        let valid = verify_password(&user_entity.hash_password, &user.password)?;
        if !valid {
            return Err(error::SystemError::unauthorized("Invalid email or password"));
        }

        let (access_token, refresh_token) = self.issue_tokens(&user_entity.id).await?;

        Ok((access_token, refresh_token, UserResponse::from(user_entity)))
    }

    pub async fn refresh(
        &self,
        refresh_token: Option<String>,
    ) -> Result<(String, String), error::SystemError> {
        let token = refresh_token
            .ok_or_else(|| error::SystemError::unauthorized("No refresh token"))?;

        let claims = Claims::decode(&token, ENV.jwt_secret.as_ref())
            .map_err(|_| error::SystemError::unauthorized("Invalid refresh token"))?;

        if claims._type != TypeClaims::RefreshToken {
            return Err(error::SystemError::unauthorized("Invalid refresh token"));
        }

        let jti = claims
            .jti
            .ok_or_else(|| error::SystemError::unauthorized("Invalid refresh token"))?;

        let key = format!("{REFRESH_KEY_PREFIX}{jti}");
        let known_user: Option<Uuid> = self.cache.get(&key).await?;
        if known_user != Some(claims.sub) {
            return Err(error::SystemError::unauthorized("Refresh token revoked"));
        }

        // Rotation: the presented token is spent either way.
        self.cache.delete(&key).await?;
        self.issue_tokens(&claims.sub).await
    }

    pub async fn sign_out(
        &self,
        refresh_token: Option<String>,
    ) -> Result<(), error::SystemError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        if let Ok(claims) = Claims::decode(&token, ENV.jwt_secret.as_ref()) {
            if let Some(jti) = claims.jti {
                self.cache.delete(&format!("{REFRESH_KEY_PREFIX}{jti}")).await?;
            }
        }

        Ok(())
    }

    pub async fn search(
        &self,
        me: Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let trimmed = query.trim();
        if trimmed.len() < 2 {
            return Ok(vec![]);
        }

        let limit = limit.clamp(1, 50);
        self.repo.search(trimmed, &me, limit).await
    }

    async fn issue_tokens(&self, user_id: &Uuid) -> Result<(String, String), error::SystemError> {
        let access_token = Claims::new(user_id, TypeClaims::AccessToken, ENV.access_token_expiration)
            .encode(ENV.jwt_secret.as_ref())?;

        let jti = Uuid::now_v7();
        let refresh_token =
            Claims::new(user_id, TypeClaims::RefreshToken, ENV.refresh_token_expiration)
                .with_jti(jti)
                .encode(ENV.jwt_secret.as_ref())?;

        let refresh_key = format!("{REFRESH_KEY_PREFIX}{jti}");
        self.cache
            .set(&refresh_key, user_id, ENV.refresh_token_expiration as usize)
            .await?;

        Ok((access_token, refresh_token))
    }
}
