/// Actor messages exchanged between session actors and the hub, plus the
/// internal outcome types. Unauthorized or malformed realtime requests are
/// dropped without a wire response; the outcomes record why, so tests can
/// observe the drop without the reason ever leaking to a client.
use actix::prelude::*;
use uuid::Uuid;

use super::message::{MessageWire, ServerMessage};

/// Why a realtime request was silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Nil or absent room id.
    MissingRoom,
    /// Message content blank after trimming.
    EmptyContent,
    /// The membership check said no. Deliberately indistinguishable from a
    /// nonexistent room on the wire.
    NotAMember,
    /// The membership check itself failed; authorization could not be
    /// established.
    MembershipUnknown,
    /// The connection vanished between arrival and processing.
    GoneConnection,
}

/// A new connection registered with the hub.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub conn_id: Uuid,
    pub addr: Recipient<ServerMessage>,
}

/// A connection is gone; drop it from every fan-out set.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub conn_id: Uuid,
}

/// Subscribe a connection to a room's fan-out set, membership permitting.
#[derive(Message)]
#[rtype(result = "SubscribeOutcome")]
pub struct Subscribe {
    pub conn_id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
}

/// Persist a message and fan it out. Membership is re-checked here on every
/// publish; a subscription held since earlier proves nothing.
#[derive(Message)]
#[rtype(result = "PublishOutcome")]
pub struct Publish {
    pub conn_id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<Uuid>,
}

/// Fan a prepared frame out to a room (used by the HTTP boundary, e.g. for
/// soft-delete notifications).
#[derive(Message)]
#[rtype(result = "()")]
pub struct BroadcastEvent {
    pub room_id: Uuid,
    pub message: ServerMessage,
}

/// Ask a session actor to stop; sent by the frame bridge when the socket
/// closes.
#[derive(Message)]
#[rtype(result = "()")]
pub struct CloseSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Joined,
    Dropped(DropReason),
}

#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Appended durably, broadcast to `recipients` connections, receipt
    /// delivered to the publisher.
    Delivered { message: MessageWire, recipients: usize },
    /// Silently ignored.
    Dropped(DropReason),
    /// Store failure after acceptance; reported to the publisher alone.
    Failed(String),
}
