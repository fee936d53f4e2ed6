use actix::Addr;
use actix_web::{delete, get, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        message::{
            model::{PageQuery, PageResponse},
            repository_pg::MessageRepositoryPg,
            service::MessageService,
        },
        room::handle::RoomSvc,
        websocket::{
            events::BroadcastEvent,
            message::ServerMessage,
            server::ChatServer,
        },
    },
    utils::ValidatedQuery,
};

pub type MessageSvc = MessageService<MessageRepositoryPg>;

/// `GET /rooms/{room_id}/messages` — registered inside the rooms scope.
/// Membership is enforced here at the boundary; the log itself does not
/// re-check it.
#[get("/{room_id}/messages")]
pub async fn get_room_messages(
    message_service: web::Data<MessageSvc>,
    room_service: web::Data<RoomSvc>,
    room_id: web::Path<Uuid>,
    query: ValidatedQuery<PageQuery>,
    req: HttpRequest,
) -> Result<success::Success<PageResponse>, error::Error> {
    let me = get_claims(&req)?.sub;
    room_service.require_member(*room_id, me).await?;

    let page = message_service.page(*room_id, query.0.limit, query.0.cursor).await?;

    Ok(success::Success::ok(Some(page)))
}

#[delete("/{message_id}")]
pub async fn delete_message(
    message_service: web::Data<MessageSvc>,
    hub: web::Data<Addr<ChatServer>>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_claims(&req)?.sub;
    let room_id = message_service.delete(*message_id, me).await?;

    hub.do_send(BroadcastEvent {
        room_id,
        message: ServerMessage::MessageDeleted { room_id, message_id: *message_id },
    });

    Ok(success::Success::no_content())
}
