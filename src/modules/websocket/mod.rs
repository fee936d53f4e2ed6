/// Realtime delivery over WebSocket.
///
/// - `message`: the client/server wire protocol
/// - `events`: actor messages between sessions and the hub
/// - `registry`: the room -> connections fan-out table
/// - `server`: the hub actor that serializes publish/broadcast
/// - `session`: one actor per authenticated connection
/// - `handler`: HTTP upgrade, handshake auth and the frame bridge
pub mod events;
pub mod handler;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
