use uuid::Uuid;

use crate::{
    api::error,
    modules::room::{
        model::{MemberRow, RoomListRow},
        repository::RoomRepository,
        schema::{RoomEntity, RoomRole, RoomType},
    },
};

#[derive(Clone)]
pub struct RoomRepositoryPg {
    pool: sqlx::PgPool,
}

impl RoomRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RoomRepository for RoomRepositoryPg {
    async fn find_by_id(&self, room_id: &Uuid) -> Result<Option<RoomEntity>, error::SystemError> {
        let room = sqlx::query_as::<_, RoomEntity>("SELECT * FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(room)
    }

    async fn find_by_direct_key(
        &self,
        direct_key: &str,
    ) -> Result<Option<RoomEntity>, error::SystemError> {
        let room = sqlx::query_as::<_, RoomEntity>("SELECT * FROM rooms WHERE direct_key = $1")
            .bind(direct_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(room)
    }

    async fn create_direct(
        &self,
        direct_key: &str,
        owner_id: &Uuid,
        peer_id: &Uuid,
    ) -> Result<RoomEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let room = sqlx::query_as::<_, RoomEntity>(
            r#"
            INSERT INTO rooms (id, type, direct_key, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(RoomType::Direct)
        .bind(direct_key)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id, role)
            VALUES ($1, $2, $3), ($1, $4, $5)
            "#,
        )
        .bind(room.id)
        .bind(owner_id)
        .bind(RoomRole::Owner)
        .bind(peer_id)
        .bind(RoomRole::Member)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(room)
    }

    async fn create_group(
        &self,
        name: &str,
        owner_id: &Uuid,
        member_ids: &[Uuid],
    ) -> Result<RoomEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let room = sqlx::query_as::<_, RoomEntity>(
            r#"
            INSERT INTO rooms (id, type, name, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(RoomType::Group)
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        for member_id in member_ids {
            let role = if member_id == owner_id { RoomRole::Owner } else { RoomRole::Member };
            sqlx::query("INSERT INTO room_members (room_id, user_id, role) VALUES ($1, $2, $3)")
                .bind(room.id)
                .bind(member_id)
                .bind(role)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(room)
    }

    async fn rooms_for_user(
        &self,
        user_id: &Uuid,
        active_only: bool,
    ) -> Result<Vec<RoomListRow>, error::SystemError> {
        let activity_filter = if active_only { "AND r.last_message_at IS NOT NULL" } else { "" };

        let query = format!(
            r#"
            SELECT r.id, r.type, r.name, r.created_by,
                   r.last_message_at, r.created_at, rm.last_read_at
            FROM rooms r
            JOIN room_members rm ON rm.room_id = r.id
            WHERE rm.user_id = $1 {activity_filter}
            ORDER BY r.last_message_at DESC NULLS LAST, r.created_at DESC
            "#
        );

        let rows = sqlx::query_as::<_, RoomListRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn members_of(&self, room_ids: &[Uuid]) -> Result<Vec<MemberRow>, error::SystemError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT rm.room_id, rm.user_id, rm.role, rm.last_read_at,
                   u.display_name, u.avatar_url
            FROM room_members rm
            JOIN users u ON u.id = rm.user_id
            WHERE rm.room_id = ANY($1)
            "#,
        )
        .bind(room_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn is_member(
        &self,
        room_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn mark_read(
        &self,
        room_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let result = sqlx::query(
            "UPDATE room_members SET last_read_at = now() WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
