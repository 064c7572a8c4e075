//! The typed call surface of a room.
//!
//! Each call here is a one-liner over [`RoomHandle::forward`] (state
//! changes) or [`RoomHandle::query`] (reads): fetch the room's config,
//! run the matching behavior capability, and for state changes store the
//! result.

use std::sync::Arc;

use roomkit_protocol::{ParticipantId, SearchParams};

use crate::{RoomBehavior, RoomError, RoomHandle};

impl<B: RoomBehavior> RoomHandle<B> {
    /// Initialises the room for `admin`. Returns the state the room now
    /// holds.
    pub async fn create(
        &self,
        admin: B::Member,
        name: Option<String>,
    ) -> Result<B::State, RoomError> {
        self.forward(move |behavior, state| async move {
            behavior.create(&admin, name.as_deref(), state).await
        })
        .await
    }

    /// Lists the names of every room `participant` belongs to, according
    /// to this room's behavior.
    pub async fn list(&self, participant: ParticipantId) -> Result<Vec<String>, RoomError> {
        self.query(move |behavior, _| async move { behavior.list(participant).await })
            .await
    }

    pub async fn list_members(&self) -> Result<Vec<B::Member>, RoomError> {
        self.query(|behavior, state| async move { behavior.list_members(&state).await })
            .await
    }

    /// Adds `member` with membership `kind`. `admin` grants admin rights.
    pub async fn add_member(
        &self,
        member: B::Member,
        kind: impl Into<String>,
        admin: bool,
    ) -> Result<(), RoomError> {
        let kind = kind.into();
        self.forward(move |behavior, state| async move {
            behavior.add_member(&member, &kind, admin, state).await
        })
        .await
        .map(drop)
    }

    pub async fn remove_member(&self, member: B::Member) -> Result<(), RoomError> {
        self.forward(move |behavior, state| async move {
            behavior.remove_member(&member, state).await
        })
        .await
        .map(drop)
    }

    /// Returns whether `member` belongs to the room.
    pub async fn is_member(&self, member: B::Member) -> Result<bool, RoomError> {
        self.query(move |behavior, state| async move {
            behavior.is_member(&member, &state).await
        })
        .await
    }

    pub async fn invite_member(&self, member: B::Member) -> Result<(), RoomError> {
        self.forward(move |behavior, state| async move {
            behavior.invite_member(&member, state).await
        })
        .await
        .map(drop)
    }

    /// Posts `message` as `member`.
    pub async fn send_message(
        &self,
        member: B::Member,
        message: B::Message,
    ) -> Result<(), RoomError> {
        self.forward(move |behavior, state| async move {
            behavior.send_message(&member, message, state).await
        })
        .await
        .map(drop)
    }

    /// Returns the room's message history as the behavior presents it.
    pub async fn messages(&self) -> Result<B::History, RoomError> {
        self.query(|behavior, state| async move { behavior.messages(&state).await })
            .await
    }

    pub async fn search_room(&self, params: SearchParams) -> Result<Vec<B::Record>, RoomError> {
        self.query(move |behavior, _| async move { behavior.search_room(&params).await })
            .await
    }

    /// Asks the behavior to write the room's current state to durable
    /// storage. The room's own state is not touched.
    pub async fn persist(&self) -> Result<(), RoomError> {
        let room_id = self.room_id();
        self.query(|behavior, state| async move { behavior.persist(&state).await })
            .await?
            .map_err(|reason| RoomError::Adapter { room_id, reason })
    }

    /// Returns the behavior currently serving this room.
    pub async fn behavior(&self) -> Result<Arc<B>, RoomError> {
        Ok(self.get_config().await?.behavior)
    }
}
