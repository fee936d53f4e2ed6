use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{
        model::{MessageRecord, NewMessage},
        repository::MessageRepository,
        schema::MessageEntity,
    },
};

const RECORD_COLUMNS: &str = r#"
    m.id, m.room_id, m.sender_id, m.content, m.reply_to_id,
    m.created_at, m.edited_at, m.deleted_at,
    u.display_name AS sender_display_name, u.avatar_url AS sender_avatar_url
"#;

#[derive(Clone)]
pub struct MessageRepositoryPg {
    pool: sqlx::PgPool,
}

impl MessageRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryPg {
    async fn append(&self, message: &NewMessage) -> Result<MessageRecord, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, MessageEntity>(
            r#"
            INSERT INTO messages (id, room_id, sender_id, content, reply_to_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(message.room_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.reply_to_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE rooms SET last_message_at = $2 WHERE id = $1")
            .bind(inserted.room_id)
            .bind(inserted.created_at)
            .execute(&mut *tx)
            .await?;

        let (sender_display_name, sender_avatar_url): (String, Option<String>) =
            sqlx::query_as("SELECT display_name, avatar_url FROM users WHERE id = $1")
                .bind(inserted.sender_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(MessageRecord {
            id: inserted.id,
            room_id: inserted.room_id,
            sender_id: inserted.sender_id,
            content: inserted.content,
            reply_to_id: inserted.reply_to_id,
            created_at: inserted.created_at,
            edited_at: inserted.edited_at,
            deleted_at: inserted.deleted_at,
            sender_display_name,
            sender_avatar_url,
        })
    }

    async fn page_before(
        &self,
        room_id: &Uuid,
        cursor: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, error::SystemError> {
        let records = match cursor {
            Some(cursor_id) => {
                let cursor_row: Option<(chrono::DateTime<chrono::Utc>, Uuid)> =
                    sqlx::query_as("SELECT created_at, id FROM messages WHERE id = $1")
                        .bind(cursor_id)
                        .fetch_optional(&self.pool)
                        .await?;

                let Some((cursor_at, cursor_id)) = cursor_row else {
                    return Err(error::SystemError::bad_request("Invalid cursor"));
                };

                sqlx::query_as::<_, MessageRecord>(&format!(
                    r#"
                    SELECT {RECORD_COLUMNS}
                    FROM messages m
                    JOIN users u ON u.id = m.sender_id
                    WHERE m.room_id = $1 AND m.deleted_at IS NULL
                      AND (m.created_at, m.id) < ($2, $3)
                    ORDER BY m.created_at DESC, m.id DESC
                    LIMIT $4
                    "#
                ))
                .bind(room_id)
                .bind(cursor_at)
                .bind(cursor_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, MessageRecord>(&format!(
                    r#"
                    SELECT {RECORD_COLUMNS}
                    FROM messages m
                    JOIN users u ON u.id = m.sender_id
                    WHERE m.room_id = $1 AND m.deleted_at IS NULL
                    ORDER BY m.created_at DESC, m.id DESC
                    LIMIT $2
                    "#
                ))
                .bind(room_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(records)
    }

    async fn latest_in_rooms(
        &self,
        room_ids: &[Uuid],
    ) -> Result<Vec<MessageRecord>, error::SystemError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT DISTINCT ON (m.room_id) {RECORD_COLUMNS}
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.room_id = ANY($1) AND m.deleted_at IS NULL
            ORDER BY m.room_id, m.created_at DESC, m.id DESC
            "#
        ))
        .bind(room_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn count_since(
        &self,
        room_id: &Uuid,
        after: chrono::DateTime<chrono::Utc>,
    ) -> Result<i64, error::SystemError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE room_id = $1 AND deleted_at IS NULL AND created_at > $2
            "#,
        )
        .bind(room_id)
        .bind(after)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }

    async fn soft_delete(
        &self,
        id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET deleted_at = now()
            WHERE id = $1 AND sender_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
