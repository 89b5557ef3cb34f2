use actix_web::{
    cookie::{time, Cookie},
    delete, get, patch, post, web, HttpRequest,
};
use uuid::Uuid;

use crate::modules::user::model::{PublicProfile, SignUpResponse};
use crate::modules::user::{model, service::UserService};
use crate::{
    api::{error, success},
    utils::{ValidatedJson, ValidatedQuery},
};
use crate::{middlewares::get_claims, ENV};

const REFRESH_COOKIE: &str = "refresh_token";
const DEFAULT_SEARCH_LIMIT: i32 = 20;

fn refresh_cookie(token: String) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token)
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(ENV.refresh_token_expiration as i64))
        .finish()
}

fn expired_refresh_cookie() -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, "")
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(0))
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .finish()
}

#[get("/profile")]
pub async fn get_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let id = get_claims(&req)?.sub;
    let user = user_service.get_by_id(id).await?;
    Ok(success::Success::ok(Some(user)).message("Profile retrieved successfully"))
}

#[patch("/profile")]
pub async fn update_profile(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::UpdateUserModel>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let id = get_claims(&req)?.sub;
    user_service.update(id, user_data.0).await?;
    Ok(success::Success::ok(None).message("User updated successfully"))
}

#[delete("/profile")]
pub async fn delete_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let id = get_claims(&req)?.sub;
    user_service.delete(id).await?;
    Ok(success::Success::no_content().cookies(vec![expired_refresh_cookie()]))
}

#[get("/search")]
pub async fn search_users(
    user_service: web::Data<UserService>,
    query: ValidatedQuery<model::SearchUserQuery>,
) -> Result<success::Success<Vec<PublicProfile>>, error::Error> {
    let query = query.0;
    let users =
        user_service.search(&query.q, query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)).await?;
    Ok(success::Success::ok(Some(users)).message("Users retrieved successfully"))
}

#[get("/{id:[0-9a-fA-F-]{36}}")]
pub async fn get_user(
    user_service: web::Data<UserService>,
    user_id: web::Path<Uuid>,
) -> Result<success::Success<PublicProfile>, error::Error> {
    let user = user_service.get_public_profile(user_id.into_inner()).await?;
    Ok(success::Success::ok(Some(user)).message("User retrieved successfully"))
}

#[post("/signup")]
pub async fn sign_up(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignUpModel>,
) -> Result<success::Success<SignUpResponse>, error::Error> {
    let user_id = user_service.sign_up(user_data.0).await?;
    Ok(success::Success::created(Some(SignUpResponse { id: user_id })).message("Signup successful"))
}

#[post("/signin")]
pub async fn sign_in(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignInModel>,
) -> Result<success::Success<model::SignInResponse>, error::Error> {
    let (access_token, refresh_token) = user_service.sign_in(user_data.0).await?;
    let response = model::SignInResponse { access_token };

    Ok(success::Success::ok(Some(response))
        .message("Signin successful")
        .cookies(vec![refresh_cookie(refresh_token)]))
}

#[post("/signout")]
pub async fn sign_out(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let refresh_token = req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string());
    user_service.sign_out(refresh_token).await?;

    Ok(success::Success::no_content().cookies(vec![expired_refresh_cookie()]))
}

#[post("/refresh")]
pub async fn refresh(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::SignInResponse>, error::Error> {
    let refresh_token = req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string());
    let (access_token, refresh_token) = user_service.refresh(refresh_token).await?;
    let response = model::SignInResponse { access_token };

    Ok(success::Success::ok(Some(response))
        .message("Refresh successful")
        .cookies(vec![refresh_cookie(refresh_token)]))
}
