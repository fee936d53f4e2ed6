use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::message::model::MessageRecord;
use crate::modules::user::model::UserBrief;

/// The normalized message record shared by broadcasts and acknowledgments.
/// Always built from the durably persisted row, never from client input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWire {
    pub id: Uuid,
    pub room_id: Uuid,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub sender: UserBrief,
}

impl From<&MessageRecord> for MessageWire {
    fn from(record: &MessageRecord) -> Self {
        MessageWire {
            id: record.id,
            room_id: record.room_id,
            content: record.content.clone(),
            created_at: record.created_at,
            sender: record.sender_brief(),
        }
    }
}

/// Frames accepted from clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join_room", rename_all = "camelCase")]
    JoinRoom { room_id: Uuid },

    #[serde(rename = "send_message", rename_all = "camelCase")]
    SendMessage {
        room: Uuid,
        message: String,
        #[serde(default)]
        reply_to_id: Option<Uuid>,
    },

    #[serde(rename = "ping")]
    Ping,
}

/// The publisher's receipt: the persisted record, or an error when the
/// store failed. Other subscribers never see the failure case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeliveryReceipt {
    Saved(MessageWire),
    Failed { error: String },
}

/// Frames emitted to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent once after the handshake binds the connection to an identity.
    #[serde(rename = "session")]
    Session { id: Uuid },

    #[serde(rename = "message:new")]
    MessageNew(MessageWire),

    #[serde(rename = "message:ack")]
    MessageAck(DeliveryReceipt),

    #[serde(rename = "message:deleted", rename_all = "camelCase")]
    MessageDeleted { room_id: Uuid, message_id: Uuid },

    #[serde(rename = "pong")]
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire() -> MessageWire {
        MessageWire {
            id: Uuid::now_v7(),
            room_id: Uuid::now_v7(),
            content: "hello".to_string(),
            created_at: chrono::Utc::now(),
            sender: UserBrief {
                id: Uuid::now_v7(),
                display_name: "Alice".to_string(),
                avatar_url: None,
            },
        }
    }

    #[test]
    fn join_room_deserializes() {
        let id = Uuid::now_v7();
        let json = format!(r#"{{"type":"join_room","roomId":"{id}"}}"#);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(msg, ClientMessage::JoinRoom { room_id } if room_id == id));
    }

    #[test]
    fn send_message_deserializes_with_and_without_reply() {
        let room = Uuid::now_v7();
        let json = format!(r#"{{"type":"send_message","room":"{room}","message":"hi"}}"#);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ClientMessage::SendMessage { room: r, message, reply_to_id } => {
                assert_eq!(r, room);
                assert_eq!(message, "hi");
                assert!(reply_to_id.is_none());
            }
            _ => panic!("Expected SendMessage variant"),
        }

        let reply = Uuid::now_v7();
        let json = format!(
            r#"{{"type":"send_message","room":"{room}","message":"hi","replyToId":"{reply}"}}"#
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(
            matches!(msg, ClientMessage::SendMessage { reply_to_id: Some(r), .. } if r == reply)
        );
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"shrug"}"#).is_err());
    }

    #[test]
    fn session_frame_shape() {
        let id = Uuid::now_v7();
        let json = serde_json::to_string(&ServerMessage::Session { id }).unwrap();
        assert!(json.contains(r#""type":"session""#));
        assert!(json.contains(&id.to_string()));
    }

    #[test]
    fn broadcast_frame_inlines_the_normalized_record() {
        let w = wire();
        let json = serde_json::to_string(&ServerMessage::MessageNew(w.clone())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "message:new");
        assert_eq!(value["id"], w.id.to_string());
        assert_eq!(value["roomId"], w.room_id.to_string());
        assert_eq!(value["sender"]["displayName"], "Alice");
        assert!(value["sender"]["avatarUrl"].is_null());
    }

    #[test]
    fn ack_carries_the_saved_record() {
        let w = wire();
        let json =
            serde_json::to_string(&ServerMessage::MessageAck(DeliveryReceipt::Saved(w.clone())))
                .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "message:ack");
        assert_eq!(value["id"], w.id.to_string());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn ack_failure_carries_only_the_error() {
        let msg = ServerMessage::MessageAck(DeliveryReceipt::Failed {
            error: "Failed to send".to_string(),
        });
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();

        assert_eq!(value["type"], "message:ack");
        assert_eq!(value["error"], "Failed to send");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn server_message_roundtrip() {
        let original = ServerMessage::MessageNew(wire());
        let json = serde_json::to_string(&original).unwrap();
        let decoded: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }
}
