use std::collections::{HashMap, HashSet};

use actix::Recipient;
use uuid::Uuid;

use super::message::ServerMessage;

/// Live connections and the per-room fan-out sets. Owned by the hub actor
/// and mutated only from its mailbox, so a disconnect can never interleave
/// with a broadcast iteration. Stale entries are harmless either way: a
/// `Recipient` whose actor stopped swallows sends.
#[derive(Default)]
pub struct RoomRegistry {
    /// conn_id -> outbound mailbox of the session actor
    connections: HashMap<Uuid, Recipient<ServerMessage>>,
    /// room_id -> conn_ids currently subscribed
    rooms: HashMap<Uuid, HashSet<Uuid>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, conn_id: Uuid, addr: Recipient<ServerMessage>) {
        self.connections.insert(conn_id, addr);
    }

    /// Remove a connection and every subscription it held. Idempotent.
    pub fn remove(&mut self, conn_id: &Uuid) {
        self.connections.remove(conn_id);
        for members in self.rooms.values_mut() {
            members.remove(conn_id);
        }
        self.rooms.retain(|_, members| !members.is_empty());
    }

    /// Add a connection to a room's fan-out set. Unknown connections are
    /// refused so a late subscribe cannot resurrect a closed session.
    pub fn subscribe(&mut self, room_id: Uuid, conn_id: Uuid) -> bool {
        if !self.connections.contains_key(&conn_id) {
            return false;
        }
        self.rooms.entry(room_id).or_default().insert(conn_id);
        true
    }

    pub fn send_to(&self, conn_id: &Uuid, message: ServerMessage) {
        if let Some(addr) = self.connections.get(conn_id) {
            addr.do_send(message);
        }
    }

    /// Deliver to every connection subscribed to the room; returns how many
    /// were addressed.
    pub fn broadcast(&self, room_id: &Uuid, message: ServerMessage) -> usize {
        let Some(members) = self.rooms.get(room_id) else {
            return 0;
        };

        let mut sent = 0;
        for conn_id in members {
            if let Some(addr) = self.connections.get(conn_id) {
                addr.do_send(message.clone());
                sent += 1;
            }
        }
        sent
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_size(&self, room_id: &Uuid) -> usize {
        self.rooms.get(room_id).map_or(0, HashSet::len)
    }
}
