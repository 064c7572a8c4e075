//! Liveness monitors.
//!
//! One watcher task per monitored room. It waits for the room to
//! terminate and then enqueues a purge into the registry loop, so cleanup
//! is ordered with every other registry request.

use roomkit_protocol::RoomId;
use roomkit_room::{RoomBehavior, RoomHandle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::registry::RegistryCommand;

/// A running watcher. Dropping it stops the watch.
pub(crate) struct Monitor<B: RoomBehavior> {
    handle: RoomHandle<B>,
    task: JoinHandle<()>,
}

impl<B: RoomBehavior> Monitor<B> {
    /// Starts watching `handle`.
    ///
    /// The watcher holds only a weak sender, so it never keeps a registry
    /// alive on its own. A room that is already dead is reported straight
    /// away.
    pub(crate) fn watch(
        handle: RoomHandle<B>,
        registry: mpsc::WeakSender<RegistryCommand<B>>,
    ) -> Self {
        let watched = handle.clone();
        let task = tokio::spawn(async move {
            watched.terminated().await;
            let room_id = watched.room_id();
            if let Some(registry) = registry.upgrade() {
                tracing::debug!(%room_id, "monitored room terminated");
                let _ = registry.send(RegistryCommand::RoomDown { room_id }).await;
            }
        });
        Self { handle, task }
    }

    pub(crate) fn room_id(&self) -> RoomId {
        self.handle.room_id()
    }

    pub(crate) fn handle(&self) -> &RoomHandle<B> {
        &self.handle
    }

    pub(crate) fn is_room_alive(&self) -> bool {
        self.handle.is_alive()
    }
}

impl<B: RoomBehavior> Drop for Monitor<B> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
