use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::configs::RedisCache;
use crate::constants::{refresh_token_key, user_cache_key, USER_CACHE_TTL};
use crate::modules::user::model::{
    PublicProfile, SignInModel, SignUpModel, UpdateUser, UpdateUserModel, UserResponse,
};
use crate::modules::user::{model::InsertUser, repository::UserRepository, schema::UserEntity};
use crate::utils::{hash_password, verify_password, Claims, TypeClaims};
use crate::ENV;

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
        let key = user_cache_key(&id);
        if let Some(cached_user) = self.cache.get::<UserResponse>(&key).await? {
            info!("User {} found in cache", id);
            return Ok(cached_user);
        }
        let entity = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let user = UserResponse::from(entity);
        self.cache.set(&key, &user, USER_CACHE_TTL).await?;
        info!("User {} cached", id);
        Ok(user)
    }

    pub async fn get_public_profile(&self, id: Uuid) -> Result<PublicProfile, error::SystemError> {
        let user = self.get_by_id(id).await?;
        Ok(PublicProfile {
            id: user.id,
            name: user.display_name,
            email: user.email,
            avatar_url: user.avatar_url,
        })
    }

    pub async fn search(
        &self,
        query: &str,
        limit: i32,
    ) -> Result<Vec<PublicProfile>, error::SystemError> {
        let users = self.repo.search_users(query, limit).await?;
        Ok(users.into_iter().map(PublicProfile::from).collect())
    }

    pub async fn update(&self, id: Uuid, user: UpdateUserModel) -> Result<(), error::SystemError> {
        if user.is_empty() {
            return Err(error::SystemError::bad_request("No fields to update"));
        }

        let update_user = UpdateUser {
            username: user.username,
            email: user.email,
            display_name: match (user.first_name, user.last_name) {
                (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
                (Some(_), None) | (None, Some(_)) => {
                    return Err(error::SystemError::bad_request(
                        "First name and last name must be updated together",
                    ));
                }
                (None, None) => None,
            },
            avatar_url: user.avatar_url,
        };

        self.repo.update(&id, &update_user).await?;

        self.cache.delete(&user_cache_key(&id)).await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), error::SystemError> {
        if !self.repo.delete(&id).await? {
            return Err(error::SystemError::not_found("User not found"));
        }
        self.cache.delete(&user_cache_key(&id)).await?;
        info!("User {} deleted", id);
        Ok(())
    }

    pub async fn sign_up(&self, user: SignUpModel) -> Result<Uuid, error::SystemError> {
        let hash_password = hash_password(&user.password)?;

        let new_user = InsertUser {
            username: user.username,
            email: user.email,
            hash_password,
            display_name: format!("{} {}", user.first_name, user.last_name),
        };

        let user_id = self.repo.create(&new_user).await?;
        info!("User {} signed up", user_id);
        Ok(user_id)
    }

    pub async fn sign_in(&self, user: SignInModel) -> Result<(String, String), error::SystemError> {
        let user_entity = self
            .repo
            .find_by_username(&user.username)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Invalid username or password"))?;

        let valid = verify_password(&user_entity.hash_password, &user.password)?;
        if !valid {
            return Err(error::SystemError::unauthorized("Invalid username or password"));
        }

        self.issue_tokens(&user_entity).await
    }

    /// Rotates the refresh token: the presented `jti` is revoked before a new pair is issued.
    pub async fn refresh(
        &self,
        refresh_token: Option<String>,
    ) -> Result<(String, String), error::SystemError> {
        let token = refresh_token
            .ok_or_else(|| error::SystemError::unauthorized("Missing refresh token"))?;

        let claims = Claims::decode(&token, ENV.jwt_secret.as_ref())
            .map_err(|_| error::SystemError::unauthorized("Token Invalid or Expired"))?;

        let jti = match (claims.is_refresh(), claims.jti) {
            (true, Some(jti)) => jti,
            _ => return Err(error::SystemError::unauthorized("Token Invalid or Expired")),
        };

        let key = refresh_token_key(&jti);
        let owner = self.cache.get::<Uuid>(&key).await?;
        if owner != Some(claims.sub) {
            return Err(error::SystemError::unauthorized("Token Invalid or Expired"));
        }
        self.cache.delete(&key).await?;

        let user_entity = self
            .repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Token Invalid or Expired"))?;

        self.issue_tokens(&user_entity).await
    }

    pub async fn sign_out(&self, refresh_token: Option<String>) -> Result<(), error::SystemError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        // an unreadable token has nothing left to revoke
        if let Ok(Claims { jti: Some(jti), .. }) = Claims::decode(&token, ENV.jwt_secret.as_ref())
        {
            self.cache.delete(&refresh_token_key(&jti)).await?;
        }
        Ok(())
    }

    async fn issue_tokens(&self, user: &UserEntity) -> Result<(String, String), error::SystemError> {
        let access_token = Claims::new(&user.id, &user.role, ENV.access_token_expiration)
            .with_type(TypeClaims::AccessToken)
            .encode(ENV.jwt_secret.as_ref())?;

        let jti = Uuid::now_v7();

        let refresh_token = Claims::new(&user.id, &user.role, ENV.refresh_token_expiration)
            .with_jti(jti)
            .with_type(TypeClaims::RefreshToken)
            .encode(ENV.jwt_secret.as_ref())?;

        self.cache
            .set(&refresh_token_key(&jti), &user.id, ENV.refresh_token_expiration as usize)
            .await?;

        Ok((access_token, refresh_token))
    }
}
