use crate::modules::message::handle::delete_message;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/messages").service(delete_message));
}
