/// HTTP upgrade for `GET /ws`.
///
/// The bearer credential is verified before the upgrade completes; a bad
/// handshake is rejected with 401 and leaves no state behind. After the
/// upgrade the spawned task bridges frames both ways:
/// - inbound:  socket -> parse `ClientMessage` -> session actor
/// - outbound: hub -> session actor -> mpsc channel -> socket
use actix::{Actor, Addr};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::Message;
use std::collections::HashMap;
use tokio::sync::mpsc;

use super::events::CloseSession;
use super::message::ClientMessage;
use super::server::ChatServer;
use super::session::WsSession;
use crate::api::error;
use crate::utils::{Claims, TypeClaims};
use crate::ENV;

/// The credential travels as connection metadata: the Authorization header,
/// or a `token` query parameter for clients that cannot set headers on a
/// WebSocket.
fn bearer_token(req: &HttpRequest) -> Option<String> {
    if let Some(header) = req.headers().get("Authorization").and_then(|h| h.to_str().ok()) {
        if let Some(token) = header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.get("token").cloned())
}

pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<ChatServer>>,
) -> Result<HttpResponse, Error> {
    let token =
        bearer_token(&req).ok_or_else(|| error::Error::unauthorized("Missing credentials"))?;

    let claims = Claims::decode(&token, ENV.jwt_secret.as_ref())
        .map_err(|_| error::Error::unauthorized("Token Invalid or Expired"))?;

    if claims._type != TypeClaims::AccessToken {
        return Err(error::Error::unauthorized("Access token required").into());
    }

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    // Outbound lane: session actor -> spawned task -> socket.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let addr = WsSession::new(claims.sub, server.get_ref().clone(), tx).start();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                msg = msg_stream.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let raw = text.to_string();
                            match serde_json::from_str::<ClientMessage>(&raw) {
                                Ok(client_msg) => addr.do_send(client_msg),
                                Err(e) => {
                                    // Malformed input is dropped, never answered.
                                    tracing::warn!(
                                        "unparseable client frame: {e} - raw: {}",
                                        &raw[..120.min(raw.len())]
                                    );
                                }
                            }
                        }

                        Some(Ok(Message::Ping(data))) => {
                            if ws_session.pong(&data).await.is_err() {
                                break;
                            }
                        }

                        Some(Ok(Message::Pong(_))) => {}

                        Some(Ok(Message::Close(reason))) => {
                            tracing::debug!("websocket close frame: {:?}", reason);
                            break;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            tracing::warn!("binary frames are not supported");
                        }

                        Some(Ok(Message::Continuation(_) | Message::Nop)) => {}

                        Some(Err(e)) => {
                            tracing::error!("websocket protocol error: {e}");
                            break;
                        }

                        // Stream ended: client is gone.
                        None => break,
                    }
                }

                Some(json) = rx.recv() => {
                    if ws_session.text(json).await.is_err() {
                        break;
                    }
                }
            }
        }

        // Stop the session actor so the hub forgets this connection.
        addr.do_send(CloseSession);
        let _ = ws_session.close(None).await;
        tracing::debug!("websocket bridge finished");
    });

    tracing::info!("websocket connection established for user {}", claims.sub);
    Ok(response)
}
