use crate::modules::room::handle::room_scope;
use actix_web::web::ServiceConfig;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(room_scope());
}
