use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        friend::{
            model::{
                FriendActionResponse, FriendActionStatus, FriendDirection, FriendListResponse,
                FriendProfile, RelationKind,
            },
            repository::FriendRepository,
            schema::{FriendEntity, FriendStatus},
        },
        user::repository::UserRepository,
    },
};

#[derive(Clone)]
pub struct FriendService<F, U>
where
    F: FriendRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    friend_repo: Arc<F>,
    user_repo: Arc<U>,
}

impl<F, U> FriendService<F, U>
where
    F: FriendRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(friend_repo: Arc<F>, user_repo: Arc<U>) -> Self {
        FriendService { friend_repo, user_repo }
    }

    async fn resolve_target(&self, me: Uuid, username: &str) -> Result<Uuid, error::SystemError> {
        let target = self
            .user_repo
            .find_by_username(&username.trim().to_lowercase())
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if target.id == me {
            return Err(error::SystemError::bad_request("Cannot friend yourself"));
        }

        Ok(target.id)
    }

    /// Request friendship with `username`. Re-requesting an existing pair
    /// never creates a second row; the response reports the state of the one
    /// row as seen from the caller's side.
    pub async fn request(
        &self,
        me: Uuid,
        username: &str,
    ) -> Result<FriendActionResponse, error::SystemError> {
        let other = self.resolve_target(me, username).await?;

        let existing = match self.friend_repo.find_pair(&me, &other).await? {
            Some(rel) => Some(rel),
            None => match self.friend_repo.create_pending(&me, &other, &me).await {
                Ok(_) => {
                    return Ok(FriendActionResponse {
                        status: FriendActionStatus::Pending,
                        direction: Some(FriendDirection::Outgoing),
                    });
                }
                // A concurrent request won the insert; report that row.
                Err(e) if e.is_conflict() => self.friend_repo.find_pair(&me, &other).await?,
                Err(e) => return Err(e),
            },
        };

        let Some(rel) = existing else {
            return Err(error::SystemError::not_found("Friend relation not found"));
        };

        match rel.status {
            FriendStatus::Blocked => Err(error::SystemError::forbidden("Blocked")),
            FriendStatus::Accepted => Ok(FriendActionResponse {
                status: FriendActionStatus::Accepted,
                direction: None,
            }),
            FriendStatus::Pending => Ok(FriendActionResponse {
                status: FriendActionStatus::Pending,
                direction: Some(direction_of(&rel, me)),
            }),
        }
    }

    /// Only the receiver of a pending request may accept it.
    pub async fn accept(
        &self,
        me: Uuid,
        username: &str,
    ) -> Result<FriendActionResponse, error::SystemError> {
        let other = self.resolve_target(me, username).await?;

        let rel = self
            .friend_repo
            .find_pair(&me, &other)
            .await?
            .ok_or_else(|| error::SystemError::not_found("No friend request found"))?;

        match rel.status {
            FriendStatus::Blocked => Err(error::SystemError::forbidden("Blocked")),
            FriendStatus::Accepted => Ok(FriendActionResponse {
                status: FriendActionStatus::Accepted,
                direction: None,
            }),
            FriendStatus::Pending => {
                if rel.requested_by == me {
                    return Err(error::SystemError::bad_request(
                        "You sent this request; wait for the other user to accept",
                    ));
                }

                self.friend_repo.set_status(&me, &other, FriendStatus::Accepted).await?;

                Ok(FriendActionResponse {
                    status: FriendActionStatus::Accepted,
                    direction: None,
                })
            }
        }
    }

    /// Decline (as receiver) or cancel (as initiator) a pending request.
    /// Both delete the row; the response distinguishes which happened.
    pub async fn decline(
        &self,
        me: Uuid,
        username: &str,
    ) -> Result<FriendActionResponse, error::SystemError> {
        let other = self.resolve_target(me, username).await?;

        let rel = self
            .friend_repo
            .find_pair(&me, &other)
            .await?
            .ok_or_else(|| error::SystemError::not_found("No friend request found"))?;

        match rel.status {
            FriendStatus::Blocked => Err(error::SystemError::forbidden("Blocked")),
            FriendStatus::Accepted => Err(error::SystemError::bad_request("Already friends")),
            FriendStatus::Pending => {
                let am_requester = rel.requested_by == me;

                self.friend_repo.delete_pair(&me, &other).await?;

                Ok(FriendActionResponse {
                    status: if am_requester {
                        FriendActionStatus::Canceled
                    } else {
                        FriendActionStatus::Declined
                    },
                    direction: None,
                })
            }
        }
    }

    pub async fn list(&self, me: Uuid) -> Result<FriendListResponse, error::SystemError> {
        let rows = self.friend_repo.rows_for_user(&me).await?;

        if rows.is_empty() {
            return Ok(FriendListResponse {
                accepted: vec![],
                pending_incoming: vec![],
                pending_outgoing: vec![],
            });
        }

        let other_ids: Vec<Uuid> = rows.iter().map(|r| r.other(&me)).collect();
        let profiles = self.user_repo.find_by_ids(&other_ids).await?;
        let by_id: HashMap<Uuid, FriendProfile> =
            profiles.iter().map(|u| (u.id, FriendProfile::from(u))).collect();

        let mut accepted = Vec::new();
        let mut pending_incoming = Vec::new();
        let mut pending_outgoing = Vec::new();

        for rel in &rows {
            let Some(profile) = by_id.get(&rel.other(&me)) else {
                continue;
            };

            match rel.status {
                FriendStatus::Accepted => accepted.push(profile.clone()),
                FriendStatus::Pending => {
                    if rel.requested_by == me {
                        pending_outgoing.push(profile.clone());
                    } else {
                        pending_incoming.push(profile.clone());
                    }
                }
                FriendStatus::Blocked => {}
            }
        }

        Ok(FriendListResponse { accepted, pending_incoming, pending_outgoing })
    }

    /// Relation of each listed user to `me`, keyed by their id. Direction is
    /// derived from `requested_by`, which is valid regardless of which side
    /// of the canonical pair the caller landed on.
    pub async fn relation_map(
        &self,
        me: Uuid,
        others: &[Uuid],
    ) -> Result<HashMap<Uuid, RelationKind>, error::SystemError> {
        if others.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self.friend_repo.rows_between(&me, others).await?;

        let mut map = HashMap::with_capacity(rows.len());
        for rel in rows {
            let other = rel.other(&me);
            match rel.status {
                FriendStatus::Accepted => {
                    map.insert(other, RelationKind::Accepted);
                }
                FriendStatus::Pending => {
                    let kind = if rel.requested_by == me {
                        RelationKind::PendingOut
                    } else {
                        RelationKind::PendingIn
                    };
                    map.insert(other, kind);
                }
                FriendStatus::Blocked => {}
            }
        }

        Ok(map)
    }
}

fn direction_of(rel: &FriendEntity, me: Uuid) -> FriendDirection {
    if rel.requested_by == me {
        FriendDirection::Outgoing
    } else {
        FriendDirection::Incoming
    }
}
