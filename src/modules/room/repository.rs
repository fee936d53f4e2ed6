use uuid::Uuid;

use crate::api::error;
use crate::modules::room::model::{MemberRow, RoomListRow};
use crate::modules::room::schema::RoomEntity;

#[async_trait::async_trait]
pub trait RoomRepository {
    async fn find_by_id(&self, room_id: &Uuid) -> Result<Option<RoomEntity>, error::SystemError>;

    async fn find_by_direct_key(
        &self,
        direct_key: &str,
    ) -> Result<Option<RoomEntity>, error::SystemError>;

    /// Create a DIRECT room with its two memberships in one transaction.
    /// A concurrent creation for the same key surfaces as `Conflict` through
    /// the unique index; the caller recovers by re-fetching.
    async fn create_direct(
        &self,
        direct_key: &str,
        owner_id: &Uuid,
        peer_id: &Uuid,
    ) -> Result<RoomEntity, error::SystemError>;

    /// Create a GROUP room with the given member set (already deduplicated,
    /// owner included) in one transaction.
    async fn create_group(
        &self,
        name: &str,
        owner_id: &Uuid,
        member_ids: &[Uuid],
    ) -> Result<RoomEntity, error::SystemError>;

    /// Rooms the user belongs to, joined with their own read watermark,
    /// ordered by activity (`last_message_at` desc nulls last, then
    /// `created_at` desc). `active_only` restricts to rooms that have seen
    /// at least one message.
    async fn rooms_for_user(
        &self,
        user_id: &Uuid,
        active_only: bool,
    ) -> Result<Vec<RoomListRow>, error::SystemError>;

    async fn members_of(
        &self,
        room_ids: &[Uuid],
    ) -> Result<Vec<MemberRow>, error::SystemError>;

    /// The authorization primitive: an existence probe against the
    /// membership primary key.
    async fn is_member(&self, room_id: &Uuid, user_id: &Uuid)
        -> Result<bool, error::SystemError>;

    /// Bump the caller's read watermark. Returns false when no membership
    /// row matched.
    async fn mark_read(
        &self,
        room_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError>;
}
