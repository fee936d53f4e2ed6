/// The hub: owns the connection registry and serializes every publish.
///
/// `Publish` is handled with an `AtomicResponse`, so the hub's mailbox is
/// suspended until membership check + durable append complete and the
/// broadcast/receipt go out in the same actor tick. Two consequences fall
/// out of that single choice: broadcasts leave in append-completion order,
/// and no disconnect can mutate the fan-out set while it is being iterated.
/// Cross-process ordering and uniqueness stay with the store itself.
use actix::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::message::handle::MessageSvc;
use crate::modules::room::handle::RoomSvc;

use super::events::*;
use super::message::{DeliveryReceipt, MessageWire, ServerMessage};
use super::registry::RoomRegistry;

/// The two store operations the hub performs on behalf of a connection.
/// Production wires this to the room directory and the message log; tests
/// substitute an in-memory store.
#[async_trait::async_trait]
pub trait HubStore: Send + Sync {
    async fn is_member(&self, room_id: Uuid, user_id: Uuid)
        -> Result<bool, error::SystemError>;

    async fn append(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        content: String,
        reply_to_id: Option<Uuid>,
    ) -> Result<MessageWire, error::SystemError>;
}

/// Production [`HubStore`]: membership from the room directory, persistence
/// (and the room-activity bump) from the message log.
pub struct SvcStore {
    pub rooms: RoomSvc,
    pub messages: MessageSvc,
}

#[async_trait::async_trait]
impl HubStore for SvcStore {
    async fn is_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, error::SystemError> {
        self.rooms.is_member(room_id, user_id).await
    }

    async fn append(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        content: String,
        reply_to_id: Option<Uuid>,
    ) -> Result<MessageWire, error::SystemError> {
        let record = self.messages.append(sender_id, room_id, &content, reply_to_id).await?;
        Ok(MessageWire::from(&record))
    }
}

enum PublishError {
    NotMember,
    MembershipUnknown,
    Store(String),
}

pub struct ChatServer {
    registry: RoomRegistry,
    store: Arc<dyn HubStore>,
}

impl ChatServer {
    pub fn new(store: Arc<dyn HubStore>) -> Self {
        Self { registry: RoomRegistry::new(), store }
    }
}

impl Actor for ChatServer {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("chat hub started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("chat hub stopped");
    }
}

impl Message for ServerMessage {
    type Result = ();
}

impl Handler<Connect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        self.registry.insert(msg.conn_id, msg.addr);
        tracing::debug!(
            "connection {} registered ({} live)",
            msg.conn_id,
            self.registry.connection_count()
        );
    }
}

impl Handler<Disconnect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        tracing::debug!("connection {} removed", msg.conn_id);
        self.registry.remove(&msg.conn_id);
    }
}

impl Handler<BroadcastEvent> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: BroadcastEvent, _: &mut Context<Self>) {
        let sent = self.registry.broadcast(&msg.room_id, msg.message);
        tracing::debug!("event broadcast to room {}: {} connections", msg.room_id, sent);
    }
}

impl Handler<Subscribe> for ChatServer {
    type Result = AtomicResponse<Self, SubscribeOutcome>;

    fn handle(&mut self, msg: Subscribe, _: &mut Context<Self>) -> Self::Result {
        let store = self.store.clone();
        let Subscribe { conn_id, user_id, room_id } = msg;

        AtomicResponse::new(Box::pin(
            async move { store.is_member(room_id, user_id).await }
                .into_actor(self)
                .map(move |member, act, _ctx| match member {
                    Ok(true) => {
                        if act.registry.subscribe(room_id, conn_id) {
                            tracing::debug!(
                                "connection {conn_id} joined room {room_id} ({} subscribed)",
                                act.registry.room_size(&room_id)
                            );
                            SubscribeOutcome::Joined
                        } else {
                            SubscribeOutcome::Dropped(DropReason::GoneConnection)
                        }
                    }
                    // Non-members get no reaction at all: a rejection would
                    // confirm the room exists.
                    Ok(false) => {
                        tracing::debug!(
                            "join of room {room_id} by user {user_id} ignored: not a member"
                        );
                        SubscribeOutcome::Dropped(DropReason::NotAMember)
                    }
                    Err(e) => {
                        tracing::error!("membership check failed for room {room_id}: {e}");
                        SubscribeOutcome::Dropped(DropReason::MembershipUnknown)
                    }
                }),
        ))
    }
}

impl Handler<Publish> for ChatServer {
    type Result = AtomicResponse<Self, PublishOutcome>;

    fn handle(&mut self, msg: Publish, _: &mut Context<Self>) -> Self::Result {
        let store = self.store.clone();
        let conn_id = msg.conn_id;
        let user_id = msg.user_id;
        let room_id = msg.room_id;

        AtomicResponse::new(Box::pin(
            async move {
                match store.is_member(room_id, user_id).await {
                    Ok(true) => {}
                    Ok(false) => return Err(PublishError::NotMember),
                    Err(e) => {
                        tracing::error!("membership check failed for room {room_id}: {e}");
                        return Err(PublishError::MembershipUnknown);
                    }
                }

                store
                    .append(room_id, user_id, msg.content, msg.reply_to_id)
                    .await
                    .map_err(|e| PublishError::Store(e.to_string()))
            }
            .into_actor(self)
            .map(move |result, act, _ctx| match result {
                Ok(wire) => {
                    // The append is durable by now; broadcast first, then
                    // the publisher's receipt. A publisher that vanished
                    // mid-append simply misses its receipt.
                    let recipients =
                        act.registry.broadcast(&room_id, ServerMessage::MessageNew(wire.clone()));
                    act.registry
                        .send_to(&conn_id, ServerMessage::MessageAck(DeliveryReceipt::Saved(wire.clone())));

                    tracing::debug!(
                        "message {} fanned out to {} connections in room {}",
                        wire.id,
                        recipients,
                        room_id
                    );
                    PublishOutcome::Delivered { message: wire, recipients }
                }
                Err(PublishError::NotMember) => {
                    tracing::debug!(
                        "publish to room {room_id} by user {user_id} ignored: not a member"
                    );
                    PublishOutcome::Dropped(DropReason::NotAMember)
                }
                Err(PublishError::MembershipUnknown) => {
                    act.registry.send_to(
                        &conn_id,
                        ServerMessage::MessageAck(DeliveryReceipt::Failed {
                            error: "Failed to send".to_string(),
                        }),
                    );
                    PublishOutcome::Failed("membership check failed".to_string())
                }
                Err(PublishError::Store(e)) => {
                    tracing::error!("persist failed for room {room_id}: {e}");
                    // Failure reaches the publisher alone; nothing partial
                    // is ever broadcast.
                    act.registry.send_to(
                        &conn_id,
                        ServerMessage::MessageAck(DeliveryReceipt::Failed {
                            error: "Failed to send".to_string(),
                        }),
                    );
                    PublishOutcome::Failed(e)
                }
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use crate::modules::user::model::UserBrief;

    #[derive(Default)]
    struct MemStore {
        members: Mutex<HashSet<(Uuid, Uuid)>>,
        appended: Mutex<Vec<MessageWire>>,
        last_activity: Mutex<HashMap<Uuid, chrono::DateTime<chrono::Utc>>>,
        fail_next_append: AtomicBool,
    }

    impl MemStore {
        fn grant(&self, room_id: Uuid, user_id: Uuid) {
            self.members.lock().unwrap().insert((room_id, user_id));
        }

        fn revoke(&self, room_id: Uuid, user_id: Uuid) {
            self.members.lock().unwrap().remove(&(room_id, user_id));
        }

        fn appended_ids(&self) -> Vec<Uuid> {
            self.appended.lock().unwrap().iter().map(|w| w.id).collect()
        }
    }

    #[async_trait::async_trait]
    impl HubStore for MemStore {
        async fn is_member(
            &self,
            room_id: Uuid,
            user_id: Uuid,
        ) -> Result<bool, error::SystemError> {
            Ok(self.members.lock().unwrap().contains(&(room_id, user_id)))
        }

        async fn append(
            &self,
            room_id: Uuid,
            sender_id: Uuid,
            content: String,
            _reply_to_id: Option<Uuid>,
        ) -> Result<MessageWire, error::SystemError> {
            if self.fail_next_append.swap(false, Ordering::SeqCst) {
                return Err(error::SystemError::DatabaseError("store unavailable".into()));
            }

            let mut appended = self.appended.lock().unwrap();
            let created_at =
                chrono::DateTime::from_timestamp(1_800_000_000 + appended.len() as i64, 0)
                    .unwrap();

            let wire = MessageWire {
                id: Uuid::now_v7(),
                room_id,
                content,
                created_at,
                sender: UserBrief {
                    id: sender_id,
                    display_name: "sender".to_string(),
                    avatar_url: None,
                },
            };
            appended.push(wire.clone());
            self.last_activity.lock().unwrap().insert(room_id, created_at);

            Ok(wire)
        }
    }

    #[derive(Default)]
    struct Recorder {
        inbox: Vec<ServerMessage>,
    }

    impl Actor for Recorder {
        type Context = Context<Self>;
    }

    impl Handler<ServerMessage> for Recorder {
        type Result = ();

        fn handle(&mut self, msg: ServerMessage, _: &mut Context<Self>) {
            self.inbox.push(msg);
        }
    }

    #[derive(Message)]
    #[rtype(result = "Inbox")]
    struct Drain;

    #[derive(MessageResponse)]
    struct Inbox(Vec<ServerMessage>);

    impl Handler<Drain> for Recorder {
        type Result = Inbox;

        fn handle(&mut self, _: Drain, _: &mut Context<Self>) -> Inbox {
            Inbox(std::mem::take(&mut self.inbox))
        }
    }

    struct Rig {
        store: Arc<MemStore>,
        server: Addr<ChatServer>,
    }

    impl Rig {
        fn new() -> Self {
            let store = Arc::new(MemStore::default());
            let server = ChatServer::new(store.clone()).start();
            Rig { store, server }
        }

        async fn connect(&self) -> (Uuid, Addr<Recorder>) {
            let recorder = Recorder::default().start();
            let conn_id = Uuid::now_v7();
            self.server
                .send(Connect { conn_id, addr: recorder.clone().recipient() })
                .await
                .unwrap();
            (conn_id, recorder)
        }

        async fn drain(&self, recorder: &Addr<Recorder>) -> Vec<ServerMessage> {
            recorder.send(Drain).await.unwrap().0
        }

        /// Mailbox barrier: resolves only after everything queued before it.
        async fn settle(&self) {
            let sink = Recorder::default().start();
            self.server
                .send(Connect { conn_id: Uuid::now_v7(), addr: sink.recipient() })
                .await
                .unwrap();
        }
    }

    fn publish(conn_id: Uuid, user_id: Uuid, room_id: Uuid, content: &str) -> Publish {
        Publish {
            conn_id,
            user_id,
            room_id,
            content: content.to_string(),
            reply_to_id: None,
        }
    }

    #[actix_web::test]
    async fn subscribe_is_gated_on_membership() {
        let rig = Rig::new();
        let room = Uuid::now_v7();
        let member = Uuid::now_v7();
        let outsider = Uuid::now_v7();
        rig.store.grant(room, member);

        let (member_conn, _) = rig.connect().await;
        let (outsider_conn, _) = rig.connect().await;

        let joined = rig
            .server
            .send(Subscribe { conn_id: member_conn, user_id: member, room_id: room })
            .await
            .unwrap();
        assert_eq!(joined, SubscribeOutcome::Joined);

        let denied = rig
            .server
            .send(Subscribe { conn_id: outsider_conn, user_id: outsider, room_id: room })
            .await
            .unwrap();
        assert_eq!(denied, SubscribeOutcome::Dropped(DropReason::NotAMember));
    }

    #[actix_web::test]
    async fn subscribe_of_a_gone_connection_is_refused() {
        let rig = Rig::new();
        let room = Uuid::now_v7();
        let user = Uuid::now_v7();
        rig.store.grant(room, user);

        let stale_conn = Uuid::now_v7();
        let outcome = rig
            .server
            .send(Subscribe { conn_id: stale_conn, user_id: user, room_id: room })
            .await
            .unwrap();
        assert_eq!(outcome, SubscribeOutcome::Dropped(DropReason::GoneConnection));
    }

    #[actix_web::test]
    async fn publish_acks_the_sender_and_skips_unsubscribed_members() {
        let rig = Rig::new();
        let room = Uuid::now_v7();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        rig.store.grant(room, alice);
        rig.store.grant(room, bob);

        // Alice subscribes; Bob is a member but never joined.
        let (alice_conn, alice_rec) = rig.connect().await;
        let (_bob_conn, bob_rec) = rig.connect().await;
        rig.server
            .send(Subscribe { conn_id: alice_conn, user_id: alice, room_id: room })
            .await
            .unwrap();

        let outcome =
            rig.server.send(publish(alice_conn, alice, room, "hi")).await.unwrap();

        let PublishOutcome::Delivered { message, recipients } = outcome else {
            panic!("expected delivery");
        };
        assert_eq!(recipients, 1);

        // The room's activity watermark moved to the persisted timestamp.
        assert_eq!(
            rig.store.last_activity.lock().unwrap().get(&room),
            Some(&message.created_at)
        );

        // Alice saw the broadcast and then her receipt with the same
        // store-assigned record.
        let frames = rig.drain(&alice_rec).await;
        assert_eq!(
            frames,
            vec![
                ServerMessage::MessageNew(message.clone()),
                ServerMessage::MessageAck(DeliveryReceipt::Saved(message)),
            ]
        );

        // Bob never subscribed: nothing at all.
        assert!(rig.drain(&bob_rec).await.is_empty());
    }

    #[actix_web::test]
    async fn publish_membership_is_rechecked_not_cached_from_subscribe() {
        let rig = Rig::new();
        let room = Uuid::now_v7();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        rig.store.grant(room, alice);
        rig.store.grant(room, bob);

        let (alice_conn, alice_rec) = rig.connect().await;
        let (bob_conn, bob_rec) = rig.connect().await;
        for (conn, user) in [(alice_conn, alice), (bob_conn, bob)] {
            rig.server
                .send(Subscribe { conn_id: conn, user_id: user, room_id: room })
                .await
                .unwrap();
        }

        // Membership revoked after subscribe: the publish must be dropped.
        rig.store.revoke(room, alice);

        let outcome =
            rig.server.send(publish(alice_conn, alice, room, "too late")).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Dropped(DropReason::NotAMember)));

        assert!(rig.drain(&alice_rec).await.is_empty());
        assert!(rig.drain(&bob_rec).await.is_empty());
        assert!(rig.store.appended.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn broadcasts_preserve_append_order() {
        let rig = Rig::new();
        let room = Uuid::now_v7();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        rig.store.grant(room, alice);
        rig.store.grant(room, bob);

        let (alice_conn, alice_rec) = rig.connect().await;
        let (bob_conn, bob_rec) = rig.connect().await;
        for (conn, user) in [(alice_conn, alice), (bob_conn, bob)] {
            rig.server
                .send(Subscribe { conn_id: conn, user_id: user, room_id: room })
                .await
                .unwrap();
        }

        // Interleaved fire-and-forget publishes from both connections.
        rig.server.do_send(publish(alice_conn, alice, room, "a1"));
        rig.server.do_send(publish(bob_conn, bob, room, "b1"));
        rig.server.do_send(publish(alice_conn, alice, room, "a2"));
        rig.server.do_send(publish(bob_conn, bob, room, "b2"));
        rig.settle().await;

        let appended = rig.store.appended_ids();
        assert_eq!(appended.len(), 4);

        for recorder in [&alice_rec, &bob_rec] {
            let seen: Vec<Uuid> = rig
                .drain(recorder)
                .await
                .into_iter()
                .filter_map(|frame| match frame {
                    ServerMessage::MessageNew(w) => Some(w.id),
                    _ => None,
                })
                .collect();
            assert_eq!(seen, appended, "broadcast order must match append order");
        }
    }

    #[actix_web::test]
    async fn store_failure_reaches_only_the_publisher() {
        let rig = Rig::new();
        let room = Uuid::now_v7();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        rig.store.grant(room, alice);
        rig.store.grant(room, bob);

        let (alice_conn, alice_rec) = rig.connect().await;
        let (bob_conn, bob_rec) = rig.connect().await;
        for (conn, user) in [(alice_conn, alice), (bob_conn, bob)] {
            rig.server
                .send(Subscribe { conn_id: conn, user_id: user, room_id: room })
                .await
                .unwrap();
        }

        rig.store.fail_next_append.store(true, Ordering::SeqCst);

        let outcome = rig.server.send(publish(alice_conn, alice, room, "doomed")).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Failed(_)));

        let frames = rig.drain(&alice_rec).await;
        assert_eq!(
            frames,
            vec![ServerMessage::MessageAck(DeliveryReceipt::Failed {
                error: "Failed to send".to_string()
            })]
        );
        assert!(rig.drain(&bob_rec).await.is_empty());
    }

    #[actix_web::test]
    async fn disconnect_is_idempotent_and_prunes_the_fanout_set() {
        let rig = Rig::new();
        let room = Uuid::now_v7();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        rig.store.grant(room, alice);
        rig.store.grant(room, bob);

        let (alice_conn, _alice_rec) = rig.connect().await;
        let (bob_conn, bob_rec) = rig.connect().await;
        for (conn, user) in [(alice_conn, alice), (bob_conn, bob)] {
            rig.server
                .send(Subscribe { conn_id: conn, user_id: user, room_id: room })
                .await
                .unwrap();
        }

        rig.server.send(Disconnect { conn_id: alice_conn }).await.unwrap();
        rig.server.send(Disconnect { conn_id: alice_conn }).await.unwrap();

        let outcome = rig.server.send(publish(bob_conn, bob, room, "anyone?")).await.unwrap();
        let PublishOutcome::Delivered { recipients, .. } = outcome else {
            panic!("expected delivery");
        };
        assert_eq!(recipients, 1);
        assert_eq!(rig.drain(&bob_rec).await.len(), 2); // broadcast + receipt
    }

    #[actix_web::test]
    async fn publisher_gone_before_processing_still_delivers_to_the_room() {
        let rig = Rig::new();
        let room = Uuid::now_v7();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        rig.store.grant(room, alice);
        rig.store.grant(room, bob);

        let (alice_conn, alice_rec) = rig.connect().await;
        let (bob_conn, bob_rec) = rig.connect().await;
        for (conn, user) in [(alice_conn, alice), (bob_conn, bob)] {
            rig.server
                .send(Subscribe { conn_id: conn, user_id: user, room_id: room })
                .await
                .unwrap();
        }

        // The disconnect outruns the publish through the mailbox.
        rig.server.send(Disconnect { conn_id: alice_conn }).await.unwrap();
        let outcome =
            rig.server.send(publish(alice_conn, alice, room, "parting words")).await.unwrap();

        // The message still lands for the remaining subscriber; the receipt
        // has nowhere to go.
        let PublishOutcome::Delivered { message, recipients } = outcome else {
            panic!("expected delivery");
        };
        assert_eq!(recipients, 1);
        assert_eq!(
            rig.drain(&bob_rec).await,
            vec![ServerMessage::MessageNew(message)]
        );
        assert!(rig.drain(&alice_rec).await.is_empty());
        assert_eq!(rig.store.appended.lock().unwrap().len(), 1);
    }
}
