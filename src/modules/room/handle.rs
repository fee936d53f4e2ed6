use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        message::handle::get_room_messages,
        message::repository_pg::MessageRepositoryPg,
        room::{
            model::{CreateGroupBody, DirectRoomBody, ListRoomsQuery, RoomDetail, RoomScope,
                RoomSummary},
            repository_pg::RoomRepositoryPg,
            service::RoomService,
        },
    },
    utils::ValidatedJson,
};

pub type RoomSvc = RoomService<RoomRepositoryPg, MessageRepositoryPg>;

#[post("/direct")]
pub async fn post_direct_room(
    room_service: web::Data<RoomSvc>,
    body: ValidatedJson<DirectRoomBody>,
    req: HttpRequest,
) -> Result<success::Success<RoomDetail>, error::Error> {
    let me = get_claims(&req)?.sub;
    let (room, created) = room_service.get_or_create_direct(me, body.0.peer_id).await?;

    if created {
        Ok(success::Success::created(Some(room)))
    } else {
        Ok(success::Success::ok(Some(room)))
    }
}

#[post("")]
pub async fn create_group_room(
    room_service: web::Data<RoomSvc>,
    body: ValidatedJson<CreateGroupBody>,
    req: HttpRequest,
) -> Result<success::Success<RoomDetail>, error::Error> {
    let me = get_claims(&req)?.sub;
    let room = room_service.create_group(me, &body.0.name, &body.0.member_ids).await?;

    Ok(success::Success::created(Some(room)))
}

#[get("")]
pub async fn list_rooms(
    room_service: web::Data<RoomSvc>,
    query: web::Query<ListRoomsQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<RoomSummary>>, error::Error> {
    let me = get_claims(&req)?.sub;
    let scope = RoomScope::parse(query.scope.as_deref());
    let rooms = room_service.list_rooms(me, scope).await?;

    Ok(success::Success::ok(Some(rooms)))
}

#[post("/{room_id}/read")]
pub async fn mark_room_read(
    room_service: web::Data<RoomSvc>,
    room_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_claims(&req)?.sub;
    room_service.mark_read(*room_id, me).await?;

    Ok(success::Success::no_content())
}

pub fn room_scope() -> actix_web::Scope {
    web::scope("/rooms")
        .service(post_direct_room)
        .service(create_group_room)
        .service(list_rooms)
        .service(mark_room_read)
        .service(get_room_messages)
}
