//! Room manager: spawns room actors and tracks them by id.

use std::collections::HashMap;
use std::sync::Arc;

use roomkit_protocol::RoomId;
use tokio::sync::Mutex;

use crate::{RoomBehavior, RoomError, RoomHandle, RoomSettings, spawn_room};

/// Spawns rooms for one behavior and remembers their handles.
///
/// Cloning a manager is cheap and every clone sees the same table, so it
/// can be shared between the facade and the registry (which uses it to
/// turn room ids from a snapshot back into handles).
///
/// Terminated rooms are dropped from the table lazily, whenever the table
/// is read.
pub struct RoomManager<B: RoomBehavior> {
    behavior: Arc<B>,
    settings: RoomSettings,
    rooms: Arc<Mutex<HashMap<RoomId, RoomHandle<B>>>>,
}

impl<B: RoomBehavior> RoomManager<B> {
    /// Creates an empty manager spawning rooms that run `behavior`.
    pub fn new(behavior: Arc<B>, settings: RoomSettings) -> Self {
        Self {
            behavior,
            settings,
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the behavior new rooms are spawned with.
    pub fn behavior(&self) -> &Arc<B> {
        &self.behavior
    }

    pub fn settings(&self) -> RoomSettings {
        self.settings
    }

    /// Spawns a room starting from the behavior's default state.
    pub async fn create_room(&self) -> RoomHandle<B> {
        self.create_room_with(B::State::default()).await
    }

    /// Spawns a room starting from `state`.
    pub async fn create_room_with(&self, state: B::State) -> RoomHandle<B> {
        let handle = spawn_room(Arc::clone(&self.behavior), state, self.settings);
        self.rooms
            .lock()
            .await
            .insert(handle.room_id(), handle.clone());
        tracing::info!(room_id = %handle.room_id(), "room created");
        handle
    }

    /// Returns the handle of a live room.
    pub async fn get(&self, room_id: RoomId) -> Option<RoomHandle<B>> {
        let mut rooms = self.rooms.lock().await;
        match rooms.get(&room_id) {
            Some(handle) if handle.is_alive() => Some(handle.clone()),
            Some(_) => {
                rooms.remove(&room_id);
                None
            }
            None => None,
        }
    }

    /// Sends the shutdown directive to a room and forgets it.
    ///
    /// This is the administrative path; it skips the admin check of
    /// [`RoomHandle::close`] and does not call the behavior's `close`.
    pub async fn destroy_room(&self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .lock()
            .await
            .remove(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;

        // An already-dead room is as destroyed as it gets.
        let _ = handle.shutdown().await;
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// Forgets every terminated room and returns their ids.
    pub async fn prune(&self) -> Vec<RoomId> {
        let mut rooms = self.rooms.lock().await;
        let dead: Vec<RoomId> = rooms
            .iter()
            .filter(|(_, handle)| !handle.is_alive())
            .map(|(id, _)| *id)
            .collect();
        for id in &dead {
            rooms.remove(id);
        }
        if !dead.is_empty() {
            tracing::debug!(pruned = dead.len(), "pruned terminated rooms");
        }
        dead
    }

    /// Returns cloned handles to all live rooms.
    pub async fn room_handles(&self) -> Vec<RoomHandle<B>> {
        self.prune().await;
        self.rooms.lock().await.values().cloned().collect()
    }

    /// Lists the ids of all live rooms.
    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.prune().await;
        self.rooms.lock().await.keys().copied().collect()
    }

    /// Returns the number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.prune().await;
        self.rooms.lock().await.len()
    }
}

impl<B: RoomBehavior> Clone for RoomManager<B> {
    fn clone(&self) -> Self {
        Self {
            behavior: Arc::clone(&self.behavior),
            settings: self.settings,
            rooms: Arc::clone(&self.rooms),
        }
    }
}
