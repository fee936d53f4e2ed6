use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::schema::{FriendEntity, FriendStatus};

/// Store access for the single-row-per-pair friendship model. All writes go
/// through the canonical `(min, max)` ordering; the primary key plus the
/// `user_a < user_b` check constraint make a second row for the same pair
/// impossible regardless of which side initiates.
#[async_trait::async_trait]
pub trait FriendRepository {
    async fn find_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<FriendEntity>, error::SystemError>;

    /// Insert a PENDING row. A concurrent duplicate surfaces as `Conflict`.
    async fn create_pending(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        requested_by: &Uuid,
    ) -> Result<FriendEntity, error::SystemError>;

    async fn set_status(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        status: FriendStatus,
    ) -> Result<(), error::SystemError>;

    async fn delete_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<(), error::SystemError>;

    async fn rows_for_user(&self, user_id: &Uuid)
        -> Result<Vec<FriendEntity>, error::SystemError>;

    async fn rows_between(
        &self,
        user_id: &Uuid,
        others: &[Uuid],
    ) -> Result<Vec<FriendEntity>, error::SystemError>;
}
