use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::models::{pair_key, RoomModel};
use crate::shared::AppError;

/// Result of attempting to add a user to a room's member set
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// User added to the member set, returns updated room data
    Added(RoomModel),
    /// User was already a member; member set unchanged
    AlreadyMember,
    /// Room does not exist
    RoomNotFound,
}

/// Trait for room persistence operations (the persistence collaborator).
///
/// `create_room` is the one place where correctness depends on an
/// external atomic guarantee: both uniqueness invariants (public name,
/// private pair) must be enforced under a single guard so racing
/// creations yield exactly one winner and the rest observe `Conflict`.
#[async_trait]
pub trait RoomRepository {
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError>;
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomModel>, AppError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<RoomModel>, AppError>;
    async fn find_by_participants(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<RoomModel>, AppError>;
    async fn list_public(&self) -> Result<Vec<RoomModel>, AppError>;
    async fn rooms_for_user(&self, user_id: &str) -> Result<Vec<RoomModel>, AppError>;

    /// Atomically adds a user to a room's member set.
    /// Duplicate joins and vanished rooms are outcomes, not errors.
    async fn add_member(&self, room_id: &str, user_id: &str) -> Result<JoinOutcome, AppError>;
}

#[derive(Default)]
struct RoomStore {
    rooms: HashMap<String, RoomModel>,
    /// Public name -> room id (the uniqueness "constraint")
    names: HashMap<String, String>,
    /// Private pair key -> room id
    pairs: HashMap<String, String>,
}

/// In-memory implementation of RoomRepository for development and testing.
/// One mutex guards the check-and-create, standing in for the unique
/// constraints a SQL-backed repository would rely on.
pub struct InMemoryRoomRepository {
    store: Mutex<RoomStore>,
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(RoomStore::default()),
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self, room))]
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();

        if let Some(name) = &room.name {
            if store.names.contains_key(name) {
                warn!(room_name = %name, "Public room name already taken");
                return Err(AppError::Conflict(format!(
                    "room '{}' already exists",
                    name
                )));
            }
        }
        if let Some(key) = &room.pair_key {
            if store.pairs.contains_key(key) {
                debug!(pair_key = %key, "Private room already exists for pair");
                return Err(AppError::Conflict("private room already exists".to_string()));
            }
        }
        if store.rooms.contains_key(&room.id) {
            return Err(AppError::Conflict(format!("room id '{}' already exists", room.id)));
        }

        if let Some(name) = &room.name {
            store.names.insert(name.clone(), room.id.clone());
        }
        if let Some(key) = &room.pair_key {
            store.pairs.insert(key.clone(), room.id.clone());
        }
        store.rooms.insert(room.id.clone(), room.clone());

        debug!(room_id = %room.id, kind = %room.kind, "Room created in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomModel>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.rooms.get(room_id).cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> Result<Option<RoomModel>, AppError> {
        let store = self.store.lock().unwrap();
        let room = store
            .names
            .get(name)
            .and_then(|id| store.rooms.get(id))
            .cloned();

        debug!(room_name = %name, found = room.is_some(), "Room lookup by name");
        Ok(room)
    }

    #[instrument(skip(self))]
    async fn find_by_participants(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<RoomModel>, AppError> {
        let key = pair_key(user_a, user_b);
        let store = self.store.lock().unwrap();
        let room = store
            .pairs
            .get(&key)
            .and_then(|id| store.rooms.get(id))
            .cloned();

        debug!(pair_key = %key, found = room.is_some(), "Room lookup by participants");
        Ok(room)
    }

    #[instrument(skip(self))]
    async fn list_public(&self) -> Result<Vec<RoomModel>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .rooms
            .values()
            .filter(|r| r.name.is_some())
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn rooms_for_user(&self, user_id: &str) -> Result<Vec<RoomModel>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .rooms
            .values()
            .filter(|r| r.has_member(user_id))
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn add_member(&self, room_id: &str, user_id: &str) -> Result<JoinOutcome, AppError> {
        let mut store = self.store.lock().unwrap();

        let room = match store.rooms.get_mut(room_id) {
            Some(room) => room,
            None => {
                debug!(room_id = %room_id, "Room not found");
                return Ok(JoinOutcome::RoomNotFound);
            }
        };

        if room.has_member(user_id) {
            debug!(room_id = %room_id, user_id = %user_id, "User already a member");
            return Ok(JoinOutcome::AlreadyMember);
        }

        room.member_ids.push(user_id.to_string());
        let updated = room.clone();

        info!(
            room_id = %room_id,
            user_id = %user_id,
            member_count = updated.member_count(),
            "User added to room"
        );

        Ok(JoinOutcome::Added(updated))
    }
}
