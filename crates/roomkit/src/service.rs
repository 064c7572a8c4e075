//! `Roomkit` builder and service.
//!
//! Ties the layers together: rooms are spawned through a
//! [`RoomManager`], memberships are recorded in a [`Registry`] that
//! resolves snapshot room ids through that same manager.

use std::path::Path;
use std::sync::Arc;

use roomkit_protocol::{JsonCodec, ParticipantId};
use roomkit_registry::{Membership, Registry, RegistrySettings, RoomRecord};
use roomkit_room::{RoomBehavior, RoomHandle, RoomManager, RoomSettings};

use crate::{RoomkitError, RoomkitSettings};

/// Builder for a [`Roomkit`] service.
///
/// # Example
///
/// ```rust,ignore
/// use roomkit::prelude::*;
///
/// let kit = RoomkitBuilder::new()
///     .room_settings(RoomSettings::default())
///     .build(MyBehavior::default());
/// let room = kit.open_room(ParticipantId(1), "general").await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoomkitBuilder {
    settings: RoomkitSettings,
}

impl RoomkitBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all settings at once, e.g. with values read from a file.
    pub fn settings(mut self, settings: RoomkitSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the timeouts and mailbox size of every room.
    pub fn room_settings(mut self, settings: RoomSettings) -> Self {
        self.settings.rooms = settings;
        self
    }

    /// Sets the registry's call timeout and mailbox size.
    pub fn registry_settings(mut self, settings: RegistrySettings) -> Self {
        self.settings.registry = settings;
        self
    }

    /// Starts the registry and returns the service. Must be called from
    /// within a Tokio runtime.
    pub fn build<B: RoomBehavior>(self, behavior: B) -> Roomkit<B> {
        self.build_shared(Arc::new(behavior))
    }

    /// Like [`build`](Self::build), for a behavior that is already shared.
    pub fn build_shared<B: RoomBehavior>(self, behavior: Arc<B>) -> Roomkit<B> {
        let rooms = RoomManager::new(behavior, self.settings.rooms);
        let registry =
            Registry::spawn_with(self.settings.registry, JsonCodec, Some(rooms.clone()));
        tracing::info!("roomkit service started");
        Roomkit { rooms, registry }
    }
}

/// A room service: room actors plus the membership registry.
///
/// Participants are identified by [`ParticipantId`]; the behavior's
/// member type must be derivable from it.
pub struct Roomkit<B: RoomBehavior> {
    rooms: RoomManager<B>,
    registry: Registry<B>,
}

impl<B> Roomkit<B>
where
    B: RoomBehavior,
    B::Member: From<ParticipantId>,
{
    /// Spawns a room named `name`, creates it with `admin` as its admin
    /// and records `admin` as entered.
    ///
    /// The record is checked before anything is spawned. If the behavior
    /// refuses to create the room, or the registry refuses the record, the
    /// actor is destroyed again and the error is returned.
    pub async fn open_room(
        &self,
        admin: ParticipantId,
        name: &str,
    ) -> Result<RoomHandle<B>, RoomkitError> {
        RoomRecord::<B>::validate_key(admin, name)?;
        let room = self.rooms.create_room().await;

        if let Err(e) = self.create_and_register(admin, &room, name).await {
            let _ = self.rooms.destroy_room(room.room_id()).await;
            return Err(e);
        }

        tracing::info!(room_id = %room.room_id(), %admin, room_name = name, "room opened");
        Ok(room)
    }

    async fn create_and_register(
        &self,
        admin: ParticipantId,
        room: &RoomHandle<B>,
        name: &str,
    ) -> Result<(), RoomkitError> {
        room.create(admin.into(), Some(name.to_string())).await?;
        self.registry
            .add(RoomRecord::new(admin, room.clone(), name, true))
            .await?;
        Ok(())
    }

    /// Adds `participant` to `room` with membership `kind` and records the
    /// room under `name`, not yet entered.
    ///
    /// The record is checked before the room is touched. If the registry
    /// still refuses it, the member is removed from the room again.
    pub async fn join(
        &self,
        participant: ParticipantId,
        room: &RoomHandle<B>,
        name: &str,
        kind: &str,
    ) -> Result<(), RoomkitError> {
        RoomRecord::<B>::validate_key(participant, name)?;
        room.add_member(participant.into(), kind, false).await?;

        if let Err(e) = self
            .registry
            .add(RoomRecord::new(participant, room.clone(), name, false))
            .await
        {
            if let Err(undo) = room.remove_member(participant.into()).await {
                tracing::warn!(
                    room_id = %room.room_id(),
                    %participant,
                    error = %undo,
                    "could not undo member add after registry failure"
                );
            }
            return Err(e.into());
        }

        tracing::debug!(room_id = %room.room_id(), %participant, room_name = name, "joined room");
        Ok(())
    }

    /// Invites `participant` to `room` and records the room under `name`,
    /// not yet entered.
    ///
    /// The record is checked before the invite is sent. Behaviors have no
    /// way to withdraw an invite, so if the registry still refuses the
    /// record the room's config from before the invite is put back.
    pub async fn invite(
        &self,
        participant: ParticipantId,
        room: &RoomHandle<B>,
        name: &str,
    ) -> Result<(), RoomkitError> {
        RoomRecord::<B>::validate_key(participant, name)?;
        let before = room.get_config().await?;
        room.invite_member(participant.into()).await?;

        if let Err(e) = self
            .registry
            .add(RoomRecord::new(participant, room.clone(), name, false))
            .await
        {
            if let Err(undo) = room.set_config(before).await {
                tracing::warn!(
                    room_id = %room.room_id(),
                    %participant,
                    error = %undo,
                    "could not undo invite after registry failure"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Removes `participant` from their room named `name`, both in the
    /// room and in the registry.
    pub async fn part(&self, participant: ParticipantId, name: &str) -> Result<(), RoomkitError> {
        let room = self.room_of(participant, name).await?;
        room.remove_member(participant.into()).await?;
        self.registry.remove_room(participant, name).await?;
        tracing::debug!(room_id = %room.room_id(), %participant, room_name = name, "left room");
        Ok(())
    }

    /// Marks the participant as having entered the room.
    pub async fn enter(&self, participant: ParticipantId, name: &str) -> Result<(), RoomkitError> {
        Ok(self.registry.update(participant, name, true).await?)
    }

    /// Marks the participant as no longer in the room. The membership
    /// itself stays.
    pub async fn leave(&self, participant: ParticipantId, name: &str) -> Result<(), RoomkitError> {
        Ok(self.registry.update(participant, name, false).await?)
    }

    /// Lists every room recorded for `participant`.
    pub async fn rooms_of(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<Membership<B>>, RoomkitError> {
        Ok(self.registry.lookup(participant).await?)
    }

    /// Returns the handle of `participant`'s room named `name`.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`](roomkit_registry::RegistryError::NotFound)
    /// if no such room is recorded.
    pub async fn room_of(
        &self,
        participant: ParticipantId,
        name: &str,
    ) -> Result<RoomHandle<B>, RoomkitError> {
        match self.registry.lookup_room(participant, name).await? {
            Some((room, _)) => Ok(room),
            None => Err(roomkit_registry::RegistryError::NotFound {
                participant,
                room_name: name.to_string(),
            }
            .into()),
        }
    }

    /// Closes `participant`'s room named `name` through the admin-gated
    /// close handshake.
    ///
    /// The registry drops the room's records on its own once the actor
    /// has terminated.
    pub async fn close_room(
        &self,
        participant: ParticipantId,
        name: &str,
    ) -> Result<(), RoomkitError> {
        let room = self.room_of(participant, name).await?;
        room.close(&participant.into()).await?;
        Ok(())
    }

    /// Queues a registry snapshot to `path`.
    pub async fn persist(&self, path: impl AsRef<Path>) -> Result<(), RoomkitError> {
        Ok(self.registry.persist(path).await?)
    }

    /// Replaces the registry's content with the snapshot at `path`.
    /// Returns the number of restored records.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<usize, RoomkitError> {
        Ok(self.registry.load(path).await?)
    }

    /// Stops the registry and destroys every room.
    pub async fn shutdown(&self) -> Result<(), RoomkitError> {
        for room_id in self.rooms.room_ids().await {
            let _ = self.rooms.destroy_room(room_id).await;
        }
        self.registry.shutdown().await?;
        tracing::info!("roomkit service stopped");
        Ok(())
    }
}

impl<B: RoomBehavior> Roomkit<B> {
    pub fn registry(&self) -> &Registry<B> {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomManager<B> {
        &self.rooms
    }
}

impl<B: RoomBehavior> Clone for Roomkit<B> {
    fn clone(&self) -> Self {
        Self {
            rooms: self.rooms.clone(),
            registry: self.registry.clone(),
        }
    }
}
