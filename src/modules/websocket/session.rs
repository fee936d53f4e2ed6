/// One actor per live connection. The identity is bound at handshake time
/// and never re-derived; the session only vets payload shape and forwards
/// hub events. Whatever fails vetting is dropped without a wire response.
use actix::prelude::*;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{CloseSession, Connect, Disconnect, DropReason, Publish, Subscribe};
use super::message::{ClientMessage, ServerMessage};
use super::server::ChatServer;

pub struct WsSession {
    pub conn_id: Uuid,
    /// Immutable for the connection's lifetime, verified before the upgrade.
    pub user_id: Uuid,
    server: Addr<ChatServer>,
    /// Outbound JSON frames, bridged to the socket by handler.rs.
    tx: mpsc::UnboundedSender<String>,
}

/// A nil room id is the "falsy" payload of the wire protocol.
pub(crate) fn vet_join(room_id: Uuid) -> Result<Uuid, DropReason> {
    if room_id.is_nil() {
        return Err(DropReason::MissingRoom);
    }
    Ok(room_id)
}

pub(crate) fn vet_publish(room_id: Uuid, content: &str) -> Result<String, DropReason> {
    if room_id.is_nil() {
        return Err(DropReason::MissingRoom);
    }

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(DropReason::EmptyContent);
    }

    Ok(trimmed.to_string())
}

impl WsSession {
    pub fn new(
        user_id: Uuid,
        server: Addr<ChatServer>,
        tx: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self { conn_id: Uuid::now_v7(), user_id, server, tx }
    }

    fn send_to_client(&self, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => {
                if self.tx.send(json).is_err() {
                    tracing::debug!("client channel closed (connection {})", self.conn_id);
                }
            }
            Err(e) => {
                tracing::error!("failed to serialize frame (connection {}): {e}", self.conn_id);
            }
        }
    }

    fn handle_client_message(&self, msg: ClientMessage) {
        match msg {
            ClientMessage::JoinRoom { room_id } => match vet_join(room_id) {
                Ok(room_id) => {
                    self.server.do_send(Subscribe {
                        conn_id: self.conn_id,
                        user_id: self.user_id,
                        room_id,
                    });
                }
                Err(reason) => {
                    tracing::debug!("join dropped (connection {}): {reason:?}", self.conn_id);
                }
            },

            ClientMessage::SendMessage { room, message, reply_to_id } => {
                match vet_publish(room, &message) {
                    Ok(content) => {
                        self.server.do_send(Publish {
                            conn_id: self.conn_id,
                            user_id: self.user_id,
                            room_id: room,
                            content,
                            reply_to_id,
                        });
                    }
                    Err(reason) => {
                        tracing::debug!(
                            "publish dropped (connection {}): {reason:?}",
                            self.conn_id
                        );
                    }
                }
            }

            ClientMessage::Ping => {
                self.send_to_client(&ServerMessage::Pong);
            }
        }
    }
}

impl Actor for WsSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!("session {} started for user {}", self.conn_id, self.user_id);

        self.server.do_send(Connect {
            conn_id: self.conn_id,
            addr: ctx.address().recipient(),
        });

        self.send_to_client(&ServerMessage::Session { id: self.user_id });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("session {} stopped", self.conn_id);
        self.server.do_send(Disconnect { conn_id: self.conn_id });
    }
}

impl Message for ClientMessage {
    type Result = ();
}

impl Handler<ClientMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, _ctx: &mut Context<Self>) {
        self.handle_client_message(msg);
    }
}

/// Frames from the hub (broadcasts, receipts) relayed to the socket.
impl Handler<ServerMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _ctx: &mut Context<Self>) {
        self.send_to_client(&msg);
    }
}

impl Handler<CloseSession> for WsSession {
    type Result = ();

    fn handle(&mut self, _: CloseSession, ctx: &mut Context<Self>) {
        ctx.stop();
    }
}
