use uuid::Uuid;

use crate::{
    api::error,
    modules::friend::{
        repository::FriendRepository,
        schema::{FriendEntity, FriendStatus},
    },
};

fn ordered<'a>(user_id_a: &'a Uuid, user_id_b: &'a Uuid) -> (&'a Uuid, &'a Uuid) {
    if user_id_a <= user_id_b {
        (user_id_a, user_id_b)
    } else {
        (user_id_b, user_id_a)
    }
}

#[derive(Clone)]
pub struct FriendRepositoryPg {
    pool: sqlx::PgPool,
}

impl FriendRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FriendRepository for FriendRepositoryPg {
    async fn find_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<FriendEntity>, error::SystemError> {
        let (user_a, user_b) = ordered(user_id_a, user_id_b);

        let relation = sqlx::query_as::<_, FriendEntity>(
            "SELECT * FROM friends WHERE user_a = $1 AND user_b = $2",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(relation)
    }

    async fn create_pending(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        requested_by: &Uuid,
    ) -> Result<FriendEntity, error::SystemError> {
        let (user_a, user_b) = ordered(user_id_a, user_id_b);

        let relation = sqlx::query_as::<_, FriendEntity>(
            r#"
            INSERT INTO friends (user_a, user_b, status, requested_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(FriendStatus::Pending)
        .bind(requested_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(relation)
    }

    async fn set_status(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        status: FriendStatus,
    ) -> Result<(), error::SystemError> {
        let (user_a, user_b) = ordered(user_id_a, user_id_b);

        sqlx::query(
            "UPDATE friends SET status = $3, updated_at = now() WHERE user_a = $1 AND user_b = $2",
        )
        .bind(user_a)
        .bind(user_b)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<(), error::SystemError> {
        let (user_a, user_b) = ordered(user_id_a, user_id_b);

        sqlx::query("DELETE FROM friends WHERE user_a = $1 AND user_b = $2")
            .bind(user_a)
            .bind(user_b)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn rows_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendEntity>, error::SystemError> {
        let rows = sqlx::query_as::<_, FriendEntity>(
            r#"
            SELECT * FROM friends
            WHERE user_a = $1 OR user_b = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn rows_between(
        &self,
        user_id: &Uuid,
        others: &[Uuid],
    ) -> Result<Vec<FriendEntity>, error::SystemError> {
        let rows = sqlx::query_as::<_, FriendEntity>(
            r#"
            SELECT * FROM friends
            WHERE (user_a = $1 AND user_b = ANY($2))
               OR (user_b = $1 AND user_a = ANY($2))
            "#,
        )
        .bind(user_id)
        .bind(others)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
