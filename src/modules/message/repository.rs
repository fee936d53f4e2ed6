use uuid::Uuid;

use crate::api::error;
use crate::modules::message::model::{MessageRecord, NewMessage};
use crate::modules::message::schema::MessageEntity;

#[async_trait::async_trait]
pub trait MessageRepository {
    /// Append a message and bump the room's `last_message_at` to the
    /// store-assigned `created_at`, atomically. Returns the persisted row
    /// with the sender profile attached; broadcasting happens only after
    /// this resolves.
    async fn append(&self, message: &NewMessage) -> Result<MessageRecord, error::SystemError>;

    /// Up to `limit` visible messages strictly older than the cursor
    /// message, newest first. Keyset on `(created_at, id)` so concurrent
    /// appends never shift pages.
    async fn page_before(
        &self,
        room_id: &Uuid,
        cursor: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, error::SystemError>;

    /// The single most recent non-deleted message of each listed room.
    async fn latest_in_rooms(
        &self,
        room_ids: &[Uuid],
    ) -> Result<Vec<MessageRecord>, error::SystemError>;

    /// Count of non-deleted messages newer than the given watermark.
    async fn count_since(
        &self,
        room_id: &Uuid,
        after: chrono::DateTime<chrono::Utc>,
    ) -> Result<i64, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError>;

    /// Mark a message deleted. Returns false when the row is missing or
    /// already deleted.
    async fn soft_delete(
        &self,
        id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<bool, error::SystemError>;
}
