use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::message::model::{MessageRecord, MessageView, NewMessage, PageResponse};
use crate::modules::message::repository::MessageRepository;

pub const DEFAULT_PAGE_SIZE: i64 = 30;
pub const MAX_PAGE_SIZE: i64 = 100;

/// The append-only message log. Membership is the caller's concern; this
/// service only guards the shape of the data itself.
#[derive(Clone)]
pub struct MessageService<M>
where
    M: MessageRepository + Send + Sync,
{
    message_repo: Arc<M>,
}

impl<M> MessageService<M>
where
    M: MessageRepository + Send + Sync,
{
    pub fn with_dependencies(message_repo: Arc<M>) -> Self {
        MessageService { message_repo }
    }

    pub async fn append(
        &self,
        sender_id: Uuid,
        room_id: Uuid,
        content: &str,
        reply_to_id: Option<Uuid>,
    ) -> Result<MessageRecord, error::SystemError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(error::SystemError::bad_request("Message content cannot be empty"));
        }

        self.message_repo
            .append(&NewMessage {
                room_id,
                sender_id,
                content: content.to_string(),
                reply_to_id,
            })
            .await
    }

    pub async fn page(
        &self,
        room_id: Uuid,
        limit: Option<i64>,
        cursor: Option<Uuid>,
    ) -> Result<PageResponse, error::SystemError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let records = self.message_repo.page_before(&room_id, cursor, limit).await?;

        // A short page means the log is exhausted.
        let next_cursor = if records.len() as i64 == limit {
            records.last().map(|r| r.id)
        } else {
            None
        };

        Ok(PageResponse {
            items: records.iter().map(MessageView::from).collect(),
            next_cursor,
        })
    }

    /// Soft-delete one of the caller's own messages. Returns the room id so
    /// the boundary can notify live subscribers.
    pub async fn delete(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<Uuid, error::SystemError> {
        let message = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        if message.sender_id != user_id {
            return Err(error::SystemError::forbidden("You can only delete your own messages"));
        }

        let deleted = self.message_repo.soft_delete(&message_id, &user_id).await?;
        if !deleted {
            return Err(error::SystemError::not_found("Message not found or already deleted"));
        }

        Ok(message.room_id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::modules::message::schema::MessageEntity;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory log with store-assigned, strictly increasing timestamps.
    #[derive(Default)]
    pub(crate) struct FakeLogRepo {
        pub messages: Mutex<Vec<MessageRecord>>,
        pub room_activity: Mutex<HashMap<Uuid, chrono::DateTime<chrono::Utc>>>,
    }

    fn stamp(seq: usize) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(1_700_000_000 + seq as i64, 0).unwrap()
    }

    #[async_trait::async_trait]
    impl MessageRepository for FakeLogRepo {
        async fn append(
            &self,
            message: &NewMessage,
        ) -> Result<MessageRecord, error::SystemError> {
            let mut messages = self.messages.lock().unwrap();
            let created_at = stamp(messages.len());

            let record = MessageRecord {
                id: Uuid::now_v7(),
                room_id: message.room_id,
                sender_id: message.sender_id,
                content: message.content.clone(),
                reply_to_id: message.reply_to_id,
                created_at,
                edited_at: None,
                deleted_at: None,
                sender_display_name: "sender".to_string(),
                sender_avatar_url: None,
            };
            messages.push(record.clone());

            self.room_activity.lock().unwrap().insert(message.room_id, created_at);

            Ok(record)
        }

        async fn page_before(
            &self,
            room_id: &Uuid,
            cursor: Option<Uuid>,
            limit: i64,
        ) -> Result<Vec<MessageRecord>, error::SystemError> {
            let messages = self.messages.lock().unwrap();

            let cursor_key = match cursor {
                Some(id) => Some(
                    messages
                        .iter()
                        .find(|m| m.id == id)
                        .map(|m| (m.created_at, m.id))
                        .ok_or_else(|| error::SystemError::bad_request("Invalid cursor"))?,
                ),
                None => None,
            };

            let mut visible: Vec<MessageRecord> = messages
                .iter()
                .filter(|m| m.room_id == *room_id && m.deleted_at.is_none())
                .filter(|m| match cursor_key {
                    Some(key) => (m.created_at, m.id) < key,
                    None => true,
                })
                .cloned()
                .collect();

            visible.sort_by(|x, y| (y.created_at, y.id).cmp(&(x.created_at, x.id)));
            visible.truncate(limit as usize);
            Ok(visible)
        }

        async fn latest_in_rooms(
            &self,
            room_ids: &[Uuid],
        ) -> Result<Vec<MessageRecord>, error::SystemError> {
            let messages = self.messages.lock().unwrap();
            let mut latest: HashMap<Uuid, MessageRecord> = HashMap::new();

            for m in messages.iter() {
                if !room_ids.contains(&m.room_id) || m.deleted_at.is_some() {
                    continue;
                }
                match latest.get(&m.room_id) {
                    Some(existing) if (existing.created_at, existing.id) > (m.created_at, m.id) => {}
                    _ => {
                        latest.insert(m.room_id, m.clone());
                    }
                }
            }

            Ok(latest.into_values().collect())
        }

        async fn count_since(
            &self,
            room_id: &Uuid,
            after: chrono::DateTime<chrono::Utc>,
        ) -> Result<i64, error::SystemError> {
            Ok(self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| {
                    m.room_id == *room_id && m.deleted_at.is_none() && m.created_at > after
                })
                .count() as i64)
        }

        async fn find_by_id(
            &self,
            id: &Uuid,
        ) -> Result<Option<MessageEntity>, error::SystemError> {
            Ok(self.messages.lock().unwrap().iter().find(|m| m.id == *id).map(|m| {
                MessageEntity {
                    id: m.id,
                    room_id: m.room_id,
                    sender_id: m.sender_id,
                    content: m.content.clone(),
                    reply_to_id: m.reply_to_id,
                    created_at: m.created_at,
                    edited_at: m.edited_at,
                    deleted_at: m.deleted_at,
                }
            }))
        }

        async fn soft_delete(
            &self,
            id: &Uuid,
            sender_id: &Uuid,
        ) -> Result<bool, error::SystemError> {
            let mut messages = self.messages.lock().unwrap();
            for m in messages.iter_mut() {
                if m.id == *id && m.sender_id == *sender_id && m.deleted_at.is_none() {
                    m.deleted_at = Some(chrono::Utc::now());
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }

    fn service() -> (MessageService<FakeLogRepo>, Arc<FakeLogRepo>) {
        let repo = Arc::new(FakeLogRepo::default());
        (MessageService::with_dependencies(repo.clone()), repo)
    }

    async fn fill(svc: &MessageService<FakeLogRepo>, room: Uuid, sender: Uuid, n: usize) {
        for i in 0..n {
            svc.append(sender, room, &format!("msg {i}"), None).await.unwrap();
        }
    }

    #[tokio::test]
    async fn append_rejects_blank_content() {
        let (svc, repo) = service();
        let err = svc.append(Uuid::now_v7(), Uuid::now_v7(), "   \n\t", None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
        assert!(repo.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_trims_content_and_bumps_room_activity() {
        let (svc, repo) = service();
        let room = Uuid::now_v7();

        let record = svc.append(Uuid::now_v7(), room, "  hello  ", None).await.unwrap();
        assert_eq!(record.content, "hello");
        assert_eq!(
            repo.room_activity.lock().unwrap().get(&room),
            Some(&record.created_at)
        );
    }

    #[tokio::test]
    async fn pagination_walks_the_full_log_without_gaps_or_duplicates() {
        let (svc, _repo) = service();
        let room = Uuid::now_v7();
        let sender = Uuid::now_v7();
        fill(&svc, room, sender, 25).await;

        let mut collected = Vec::new();
        let mut cursor = None;
        let mut lens = Vec::new();

        loop {
            let page = svc.page(room, Some(10), cursor).await.unwrap();
            lens.push(page.items.len());
            collected.extend(page.items.iter().map(|m| m.id));
            match page.next_cursor {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        assert_eq!(lens, vec![10, 10, 5]);
        assert_eq!(collected.len(), 25);

        let mut unique = collected.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 25, "pages must not overlap");

        // Newest-first across page boundaries.
        let full = svc.page(room, Some(100), None).await.unwrap();
        let expected: Vec<Uuid> = full.items.iter().map(|m| m.id).collect();
        assert_eq!(collected, expected);
    }

    #[tokio::test]
    async fn page_size_is_clamped_to_the_maximum() {
        let (svc, _repo) = service();
        let room = Uuid::now_v7();
        fill(&svc, room, Uuid::now_v7(), 105).await;

        let page = svc.page(room, Some(500), None).await.unwrap();
        assert_eq!(page.items.len(), MAX_PAGE_SIZE as usize);
        assert!(page.next_cursor.is_some());
    }

    #[tokio::test]
    async fn exhausted_page_has_no_cursor() {
        let (svc, _repo) = service();
        let room = Uuid::now_v7();
        fill(&svc, room, Uuid::now_v7(), 3).await;

        let page = svc.page(room, Some(10), None).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn deleted_messages_disappear_from_pages() {
        let (svc, _repo) = service();
        let room = Uuid::now_v7();
        let sender = Uuid::now_v7();
        fill(&svc, room, sender, 5).await;

        let page = svc.page(room, Some(10), None).await.unwrap();
        let victim = page.items[2].id;

        svc.delete(victim, sender).await.unwrap();

        let after = svc.page(room, Some(10), None).await.unwrap();
        assert_eq!(after.items.len(), 4);
        assert!(after.items.iter().all(|m| m.id != victim));
    }

    #[tokio::test]
    async fn only_the_sender_may_delete() {
        let (svc, _repo) = service();
        let room = Uuid::now_v7();
        let sender = Uuid::now_v7();
        let record = svc.append(sender, room, "mine", None).await.unwrap();

        let err = svc.delete(record.id, Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        let room_id = svc.delete(record.id, sender).await.unwrap();
        assert_eq!(room_id, room);

        // Idempotence boundary: a second delete reports the row as gone.
        let err = svc.delete(record.id, sender).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }
}
