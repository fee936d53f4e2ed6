use actix_web::{
    cookie::{time, Cookie},
    get, patch, post, web, HttpRequest,
};

use crate::modules::friend::handle::FriendSvc;
use crate::modules::user::{model, service::UserService};
use crate::{
    api::{error, success},
    middlewares::get_claims,
    utils::{ValidatedJson, ValidatedQuery},
    ENV,
};

fn refresh_cookie(token: String) -> Cookie<'static> {
    Cookie::build("refresh_token", token)
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(ENV.refresh_token_expiration as i64))
        .finish()
}

fn expired_refresh_cookie() -> Cookie<'static> {
    Cookie::build("refresh_token", "")
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(0))
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .finish()
}

#[post("/signup")]
pub async fn sign_up(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignUpModel>,
) -> Result<success::Success<model::AuthResponse>, error::Error> {
    let (access_token, refresh_token, user) = user_service.sign_up(user_data.0).await?;

    Ok(success::Success::created(Some(model::AuthResponse { access_token, user }))
        .message("Signup successful")
        .cookies(vec![refresh_cookie(refresh_token)]))
}

#[post("/signin")]
pub async fn sign_in(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignInModel>,
) -> Result<success::Success<model::AuthResponse>, error::Error> {
    let (access_token, refresh_token, user) = user_service.sign_in(user_data.0).await?;

    Ok(success::Success::ok(Some(model::AuthResponse { access_token, user }))
        .message("Signin successful")
        .cookies(vec![refresh_cookie(refresh_token)]))
}

#[post("/refresh")]
pub async fn refresh(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::AccessTokenResponse>, error::Error> {
    let presented = req.cookie("refresh_token").map(|c| c.value().to_string());
    let (access_token, refresh_token) = user_service.refresh(presented).await?;

    Ok(success::Success::ok(Some(model::AccessTokenResponse { access_token }))
        .message("Refresh successful")
        .cookies(vec![refresh_cookie(refresh_token)]))
}

#[post("/signout")]
pub async fn sign_out(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let presented = req.cookie("refresh_token").map(|c| c.value().to_string());
    user_service.sign_out(presented).await?;

    Ok(success::Success::no_content().cookies(vec![expired_refresh_cookie()]))
}

#[get("/me")]
pub async fn get_me(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let id = get_claims(&req)?.sub;
    let user = user_service.get_by_id(id).await?;
    Ok(success::Success::ok(Some(user)).message("Profile retrieved successfully"))
}

#[patch("/me")]
pub async fn update_me(
    user_service: web::Data<UserService>,
    changes: ValidatedJson<model::UpdateProfileModel>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let id = get_claims(&req)?.sub;
    let user = user_service.update_profile(id, changes.0).await?;
    Ok(success::Success::ok(Some(user)).message("Profile updated successfully"))
}

#[get("/search")]
pub async fn search_users(
    user_service: web::Data<UserService>,
    friend_service: web::Data<FriendSvc>,
    query: ValidatedQuery<model::SearchQuery>,
    req: HttpRequest,
) -> Result<success::Success<model::SearchResponse>, error::Error> {
    let me = get_claims(&req)?.sub;
    let q = query.0.q.unwrap_or_default();
    let limit = query.0.limit.unwrap_or(20);

    let matches = user_service.search(me, &q, limit).await?;

    let ids: Vec<uuid::Uuid> = matches.iter().map(|u| u.id).collect();
    let relations = friend_service.relation_map(me, &ids).await?;

    let items = matches
        .into_iter()
        .map(|u| model::SearchItem {
            relation: relations.get(&u.id).copied().unwrap_or_default(),
            id: u.id,
            display_name: u.display_name,
            email: u.email,
            avatar_url: u.avatar_url,
        })
        .collect();

    Ok(success::Success::ok(Some(model::SearchResponse { items })))
}
