use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{modules::user::schema::UserEntity, utils::double_option};

#[derive(Deserialize, Validate)]
pub struct SignUpModel {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: String,
}

#[derive(Deserialize, Validate)]
pub struct SignInModel {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct UpdateUserModel {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

impl UpdateUserModel {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.avatar_url.is_none()
    }
}

#[derive(Deserialize, Validate)]
pub struct SearchUserQuery {
    #[validate(length(min = 1, max = 64, message = "Query must be 1 to 64 characters long"))]
    pub q: String,
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<i32>,
}

pub struct InsertUser {
    pub username: String,
    pub email: String,
    pub hash_password: String,
    pub display_name: String,
}

pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<Option<String>>,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub access_token: String,
}

#[derive(Deserialize, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<UserEntity> for UserResponse {
    fn from(entity: UserEntity) -> Self {
        UserResponse {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            display_name: entity.display_name,
            avatar_url: entity.avatar_url,
        }
    }
}

/// Public projection other users get to see.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl From<&UserEntity> for PublicProfile {
    fn from(user: &UserEntity) -> Self {
        PublicProfile {
            id: user.id,
            name: user.display_name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

impl From<UserEntity> for PublicProfile {
    fn from(user: UserEntity) -> Self {
        PublicProfile {
            id: user.id,
            name: user.display_name,
            email: user.email,
            avatar_url: user.avatar_url,
        }
    }
}
