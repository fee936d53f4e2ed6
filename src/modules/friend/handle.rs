use actix_web::{get, post, web, HttpRequest};

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        friend::{
            model::{FriendActionResponse, FriendListResponse, UsernameBody},
            repository_pg::FriendRepositoryPg,
            service::FriendService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::ValidatedJson,
};

pub type FriendSvc = FriendService<FriendRepositoryPg, UserRepositoryPg>;

#[post("/request")]
pub async fn request_friend(
    friend_service: web::Data<FriendSvc>,
    body: ValidatedJson<UsernameBody>,
    req: HttpRequest,
) -> Result<success::Success<FriendActionResponse>, error::Error> {
    let me = get_claims(&req)?.sub;
    let response = friend_service.request(me, &body.0.username).await?;

    Ok(success::Success::ok(Some(response)))
}

#[post("/accept")]
pub async fn accept_friend(
    friend_service: web::Data<FriendSvc>,
    body: ValidatedJson<UsernameBody>,
    req: HttpRequest,
) -> Result<success::Success<FriendActionResponse>, error::Error> {
    let me = get_claims(&req)?.sub;
    let response = friend_service.accept(me, &body.0.username).await?;

    Ok(success::Success::ok(Some(response)))
}

#[post("/decline")]
pub async fn decline_friend(
    friend_service: web::Data<FriendSvc>,
    body: ValidatedJson<UsernameBody>,
    req: HttpRequest,
) -> Result<success::Success<FriendActionResponse>, error::Error> {
    let me = get_claims(&req)?.sub;
    let response = friend_service.decline(me, &body.0.username).await?;

    Ok(success::Success::ok(Some(response)))
}

#[get("")]
pub async fn list_friends(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
) -> Result<success::Success<FriendListResponse>, error::Error> {
    let me = get_claims(&req)?.sub;
    let listing = friend_service.list(me).await?;

    Ok(success::Success::ok(Some(listing)))
}
