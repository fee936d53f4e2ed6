use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        message::{model::MessageView, repository::MessageRepository},
        room::{
            model::{direct_key_for, MemberRow, RoomDetail, RoomScope, RoomSummary},
            repository::RoomRepository,
            schema::{RoomEntity, RoomType},
        },
    },
};

/// The room directory: direct-room identity, group creation, membership
/// checks and the activity/unread bookkeeping behind `GET /rooms`.
#[derive(Clone)]
pub struct RoomService<R, M>
where
    R: RoomRepository + Send + Sync,
    M: MessageRepository + Send + Sync,
{
    room_repo: Arc<R>,
    message_repo: Arc<M>,
}

impl<R, M> RoomService<R, M>
where
    R: RoomRepository + Send + Sync,
    M: MessageRepository + Send + Sync,
{
    pub fn with_dependencies(room_repo: Arc<R>, message_repo: Arc<M>) -> Self {
        RoomService { room_repo, message_repo }
    }

    /// Resolve or create the single DM room for `(me, peer)`. Losing the
    /// creation race is not an error: the unique `direct_key` rejects the
    /// duplicate and the winner's row is returned instead.
    pub async fn get_or_create_direct(
        &self,
        me: Uuid,
        peer: Uuid,
    ) -> Result<(RoomDetail, bool), error::SystemError> {
        if peer == me {
            return Err(error::SystemError::bad_request("Invalid peerId"));
        }

        let key = direct_key_for(&me, &peer);

        if let Some(room) = self.room_repo.find_by_direct_key(&key).await? {
            return Ok((self.detail(room).await?, false));
        }

        match self.room_repo.create_direct(&key, &me, &peer).await {
            Ok(room) => Ok((self.detail(room).await?, true)),
            Err(e) if e.is_conflict() => {
                let room = self
                    .room_repo
                    .find_by_direct_key(&key)
                    .await?
                    .ok_or_else(|| error::SystemError::not_found("Room not found"))?;
                Ok((self.detail(room).await?, false))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create_group(
        &self,
        me: Uuid,
        name: &str,
        member_ids: &[Uuid],
    ) -> Result<RoomDetail, error::SystemError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(error::SystemError::bad_request("name required"));
        }

        // Creator first, then the rest in request order, deduplicated.
        let mut members: Vec<Uuid> = vec![me];
        for id in member_ids {
            if !members.contains(id) {
                members.push(*id);
            }
        }

        let room = self.room_repo.create_group(name, &me, &members).await?;
        self.detail(room).await
    }

    pub async fn list_rooms(
        &self,
        me: Uuid,
        scope: RoomScope,
    ) -> Result<Vec<RoomSummary>, error::SystemError> {
        let rows = self.room_repo.rooms_for_user(&me, scope == RoomScope::Recent).await?;
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let room_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let mut members_by_room: HashMap<Uuid, Vec<MemberRow>> = HashMap::new();
        for member in self.room_repo.members_of(&room_ids).await? {
            members_by_room.entry(member.room_id).or_default().push(member);
        }

        let latest: HashMap<Uuid, _> = self
            .message_repo
            .latest_in_rooms(&room_ids)
            .await?
            .into_iter()
            .map(|m| (m.room_id, m))
            .collect();

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            // A member who has never read anything sees everything unread.
            let watermark = row.last_read_at.unwrap_or(chrono::DateTime::UNIX_EPOCH);
            let unread_count = self.message_repo.count_since(&row.id, watermark).await?;

            let members = members_by_room.remove(&row.id).unwrap_or_default();
            let other_user = (row._type == RoomType::Direct)
                .then(|| members.iter().find(|m| m.user_id != me).map(|m| m.brief()))
                .flatten();

            summaries.push(RoomSummary {
                id: row.id,
                _type: row._type,
                name: row.name,
                created_by: row.created_by,
                last_message_at: row.last_message_at,
                created_at: row.created_at,
                members: members.iter().map(Into::into).collect(),
                last_message: latest.get(&row.id).map(MessageView::from),
                unread_count,
                other_user,
            });
        }

        Ok(summaries)
    }

    pub async fn is_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, error::SystemError> {
        self.room_repo.is_member(&room_id, &user_id).await
    }

    /// Boundary guard for room-scoped HTTP operations.
    pub async fn require_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), error::SystemError> {
        if !self.room_repo.is_member(&room_id, &user_id).await? {
            return Err(error::SystemError::forbidden("Not a room member"));
        }
        Ok(())
    }

    pub async fn mark_read(&self, room_id: Uuid, me: Uuid) -> Result<(), error::SystemError> {
        let updated = self.room_repo.mark_read(&room_id, &me).await?;
        if !updated {
            return Err(error::SystemError::forbidden("Not a room member"));
        }
        Ok(())
    }

    async fn detail(&self, room: RoomEntity) -> Result<RoomDetail, error::SystemError> {
        let members = self.room_repo.members_of(&[room.id]).await?;
        Ok(RoomDetail::from_parts(room, &members))
    }
}
