use crate::modules::friend::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/friends")
            .service(request_friend)
            .service(accept_friend)
            .service(decline_friend)
            .service(list_friends),
    );
}
