use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::RoomModel,
    repository::{JoinOutcome, RoomRepository},
};
use crate::shared::AppError;

/// Service for room identity, membership and creation races.
///
/// Membership is durable group affiliation; whether a connection is
/// attached to the room's live channel is a transport concern handled
/// by the connection lifecycle, with membership as its source of truth.
pub struct RoomService {
    repository: Arc<dyn RoomRepository + Send + Sync>,
}

impl RoomService {
    pub fn new(repository: Arc<dyn RoomRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Creates a new public room with a unique name. Exactly one of any
    /// set of racing creators wins; the rest observe `Conflict` from the
    /// repository's uniqueness guarantee.
    #[instrument(skip(self))]
    pub async fn create_public(
        &self,
        name: &str,
        creator_id: &str,
    ) -> Result<RoomModel, AppError> {
        if self.repository.find_by_name(name).await?.is_some() {
            debug!(room_name = %name, "Public room name already exists");
            return Err(AppError::Conflict(format!("room '{}' already exists", name)));
        }

        let room = RoomModel::new_public(name.to_string(), creator_id.to_string());
        self.repository.create_room(&room).await?;

        info!(
            room_id = %room.id,
            room_name = %name,
            creator = %creator_id,
            "Public room created"
        );

        Ok(room)
    }

    #[instrument(skip(self))]
    pub async fn find_public_by_name(&self, name: &str) -> Result<Option<RoomModel>, AppError> {
        self.repository.find_by_name(name).await
    }

    /// Joins a public room by name. A duplicate join or a vanished room
    /// is a soft outcome the caller surfaces to the client, not an error.
    #[instrument(skip(self))]
    pub async fn join_public(&self, name: &str, user_id: &str) -> Result<JoinOutcome, AppError> {
        let room = self
            .repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("room '{}' not found", name)))?;

        let outcome = self.repository.add_member(&room.id, user_id).await?;

        match &outcome {
            JoinOutcome::Added(updated) => info!(
                room_id = %updated.id,
                user_id = %user_id,
                member_count = updated.member_count(),
                "User joined public room"
            ),
            JoinOutcome::AlreadyMember => debug!(
                room_id = %room.id,
                user_id = %user_id,
                "Join was a no-op, user already a member"
            ),
            JoinOutcome::RoomNotFound => warn!(
                room_id = %room.id,
                user_id = %user_id,
                "Room vanished between lookup and join"
            ),
        }

        Ok(outcome)
    }

    /// Resolves the private room for an unordered pair of users, creating
    /// it on first reference. A `Conflict` from a concurrent duplicate
    /// create resolves by retrying the lookup.
    #[instrument(skip(self))]
    pub async fn find_or_create_private(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<RoomModel, AppError> {
        if let Some(room) = self.repository.find_by_participants(user_a, user_b).await? {
            return Ok(room);
        }

        let room = RoomModel::new_private(user_a.to_string(), user_b.to_string());
        match self.repository.create_room(&room).await {
            Ok(()) => {
                info!(
                    room_id = %room.id,
                    user_a = %user_a,
                    user_b = %user_b,
                    "Private room created on first reference"
                );
                Ok(room)
            }
            Err(AppError::Conflict(_)) => {
                // Lost the creation race; the winner's room must be visible now
                debug!(user_a = %user_a, user_b = %user_b, "Lost private room creation race, retrying lookup");
                self.repository
                    .find_by_participants(user_a, user_b)
                    .await?
                    .ok_or(AppError::Internal)
            }
            Err(e) => Err(e),
        }
    }

    /// Lists rooms the user is a member of, used to replay channel
    /// attachments on connect.
    #[instrument(skip(self))]
    pub async fn rooms_for_user(&self, user_id: &str) -> Result<Vec<RoomModel>, AppError> {
        self.repository.rooms_for_user(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_public(&self) -> Result<Vec<RoomModel>, AppError> {
        self.repository.list_public().await
    }

    #[instrument(skip(self))]
    pub async fn get_room(&self, room_id: &str) -> Result<Option<RoomModel>, AppError> {
        self.repository.get_room(room_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::repository::InMemoryRoomRepository;

    fn service() -> (Arc<InMemoryRoomRepository>, RoomService) {
        let repo = Arc::new(InMemoryRoomRepository::new());
        let service = RoomService::new(repo.clone());
        (repo, service)
    }

    #[tokio::test]
    async fn test_create_public_room() {
        let (_, service) = service();

        let room = service.create_public("general", "alice").await.unwrap();

        assert_eq!(room.name.as_deref(), Some("general"));
        assert!(room.has_member("alice"));
    }

    #[tokio::test]
    async fn test_create_public_duplicate_name_is_conflict() {
        let (_, service) = service();

        service.create_public("general", "alice").await.unwrap();
        let result = service.create_public("general", "bob").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_concurrent_create_public_single_winner() {
        let (_, service) = service();
        let service = Arc::new(service);

        let handles = (0..8)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.create_public("general", &format!("user-{}", i)).await })
            })
            .collect::<Vec<_>>();

        let results = futures::future::join_all(handles).await;

        let (successes, conflicts): (Vec<_>, Vec<_>) = results
            .into_iter()
            .map(|r| r.unwrap())
            .partition(|r| r.is_ok());

        assert_eq!(successes.len(), 1);
        assert_eq!(conflicts.len(), 7);
        assert!(conflicts
            .iter()
            .all(|r| matches!(r, Err(AppError::Conflict(_)))));
    }

    #[tokio::test]
    async fn test_join_public_unknown_room_is_not_found() {
        let (_, service) = service();

        let result = service.join_public("missing", "bob").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_join_public_twice_is_soft_outcome() {
        let (_, service) = service();
        service.create_public("general", "alice").await.unwrap();

        let first = service.join_public("general", "bob").await.unwrap();
        assert!(matches!(first, JoinOutcome::Added(_)));

        let second = service.join_public("general", "bob").await.unwrap();
        assert!(matches!(second, JoinOutcome::AlreadyMember));
    }

    #[tokio::test]
    async fn test_find_or_create_private_is_unordered_and_idempotent() {
        let (_, service) = service();

        let first = service.find_or_create_private("alice", "bob").await.unwrap();
        let second = service.find_or_create_private("bob", "alice").await.unwrap();
        let third = service.find_or_create_private("alice", "bob").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.id, third.id);
        assert_eq!(first.member_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_private_creates_resolve_to_one_room() {
        let (repo, service) = service();
        let service = Arc::new(service);

        let handles = (0..8)
            .map(|i| {
                let service = Arc::clone(&service);
                // Alternate argument order across racers
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        service.find_or_create_private("alice", "bob").await
                    } else {
                        service.find_or_create_private("bob", "alice").await
                    }
                })
            })
            .collect::<Vec<_>>();

        let results = futures::future::join_all(handles).await;

        let ids: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap().id)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));

        // Exactly one room exists for the pair
        let rooms = repo.rooms_for_user("alice").await.unwrap();
        assert_eq!(rooms.len(), 1);
    }

    #[tokio::test]
    async fn test_rooms_for_user_lists_memberships() {
        let (_, service) = service();

        service.create_public("general", "alice").await.unwrap();
        service.find_or_create_private("alice", "bob").await.unwrap();

        let rooms = service.rooms_for_user("alice").await.unwrap();
        assert_eq!(rooms.len(), 2);

        let rooms = service.rooms_for_user("carol").await.unwrap();
        assert!(rooms.is_empty());
    }
}
