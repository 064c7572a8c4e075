//! The membership registry actor.
//!
//! A single Tokio task owns the participant table and handles requests one
//! at a time in arrival order. Callers hold a cheap, cloneable
//! [`Registry`] handle and every call is bounded by
//! [`RegistrySettings::call_timeout`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use roomkit_protocol::{Codec, JsonCodec, ParticipantId, RoomId};
use roomkit_room::{RoomBehavior, RoomHandle, RoomManager};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

use crate::monitor::Monitor;
use crate::snapshot::{self, SnapshotEntry, SnapshotFile};
use crate::{Membership, RegistryError, RegistrySettings, RoomRecord};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Requests the registry loop understands.
pub(crate) enum RegistryCommand<B: RoomBehavior> {
    Add {
        record: RoomRecord<B>,
        reply: oneshot::Sender<()>,
    },
    Lookup {
        participant: ParticipantId,
        reply: oneshot::Sender<Vec<Membership<B>>>,
    },
    LookupRoom {
        participant: ParticipantId,
        room_name: String,
        reply: oneshot::Sender<Option<(RoomHandle<B>, bool)>>,
    },
    Update {
        participant: ParticipantId,
        room_name: String,
        entered: bool,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    Remove {
        participant: ParticipantId,
        reply: oneshot::Sender<()>,
    },
    RemoveRoom {
        participant: ParticipantId,
        room_name: String,
        reply: oneshot::Sender<()>,
    },
    Persist {
        path: PathBuf,
    },
    Load {
        path: PathBuf,
        reply: oneshot::Sender<Result<usize, RegistryError>>,
    },
    Stats {
        reply: oneshot::Sender<RegistryStats>,
    },
    /// Sent by a liveness monitor once its room has terminated.
    RoomDown {
        room_id: RoomId,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Table sizes, for tooling and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Participants with at least one tuple.
    pub participants: usize,
    /// Stored tuples across all participants.
    pub records: usize,
    /// Rooms currently watched for termination.
    pub monitored: usize,
}

// ---------------------------------------------------------------------------
// Registry handle
// ---------------------------------------------------------------------------

/// Handle to a running membership registry.
///
/// Maps each participant to the rooms they belong to, as
/// `(handle, room_name, entered)` tuples. Every room referenced by a
/// tuple is monitored; once a room terminates, its tuples disappear.
///
/// `(participant, room_name)` is unique: adding a record for a pair that
/// already exists replaces that tuple in place.
pub struct Registry<B: RoomBehavior> {
    sender: mpsc::Sender<RegistryCommand<B>>,
    settings: RegistrySettings,
}

impl<B: RoomBehavior> Registry<B> {
    /// Spawns a registry with default settings and JSON snapshots.
    ///
    /// Without a [`RoomManager`], [`load`](Self::load) can only resolve
    /// rooms this registry is already monitoring.
    pub fn spawn() -> Self {
        Self::spawn_with(RegistrySettings::default(), JsonCodec, None)
    }

    /// Spawns a registry that resolves snapshot room ids through `rooms`.
    pub fn spawn_with_rooms(rooms: RoomManager<B>) -> Self {
        Self::spawn_with(RegistrySettings::default(), JsonCodec, Some(rooms))
    }

    /// Spawns a registry with explicit settings, snapshot codec and room
    /// resolver. Must be called from within a Tokio runtime.
    pub fn spawn_with<C: Codec>(
        settings: RegistrySettings,
        codec: C,
        rooms: Option<RoomManager<B>>,
    ) -> Self {
        let settings = settings.validated();
        let (tx, rx) = mpsc::channel(settings.channel_size);

        let actor = RegistryActor {
            table: HashMap::new(),
            monitors: HashMap::new(),
            rooms,
            codec: Arc::new(codec),
            pending_write: None,
            receiver: rx,
            weak: tx.downgrade(),
        };
        tokio::spawn(actor.run());

        Self {
            sender: tx,
            settings,
        }
    }

    pub fn settings(&self) -> RegistrySettings {
        self.settings
    }

    /// Inserts `record` and starts monitoring its room.
    ///
    /// # Errors
    /// [`RegistryError::InvalidRecord`] if the record fails validation;
    /// nothing is inserted.
    pub async fn add(&self, record: RoomRecord<B>) -> Result<(), RegistryError> {
        record.validate()?;
        self.call(|reply| RegistryCommand::Add { record, reply }).await
    }

    /// Returns every tuple stored for `participant`, in insertion order.
    pub async fn lookup(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<Membership<B>>, RegistryError> {
        self.call(|reply| RegistryCommand::Lookup { participant, reply })
            .await
    }

    /// Returns the handle and `entered` flag of `participant`'s room named
    /// `room_name`.
    pub async fn lookup_room(
        &self,
        participant: ParticipantId,
        room_name: &str,
    ) -> Result<Option<(RoomHandle<B>, bool)>, RegistryError> {
        let room_name = room_name.to_string();
        self.call(|reply| RegistryCommand::LookupRoom {
            participant,
            room_name,
            reply,
        })
        .await
    }

    /// Sets the `entered` flag of one tuple, keeping its position.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if no such tuple exists; the table is
    /// left unchanged.
    pub async fn update(
        &self,
        participant: ParticipantId,
        room_name: &str,
        entered: bool,
    ) -> Result<(), RegistryError> {
        let room_name = room_name.to_string();
        self.call(|reply| RegistryCommand::Update {
            participant,
            room_name,
            entered,
            reply,
        })
        .await?
    }

    /// Deletes every tuple for `participant`. Removing an unknown
    /// participant is not an error.
    pub async fn remove(&self, participant: ParticipantId) -> Result<(), RegistryError> {
        self.call(|reply| RegistryCommand::Remove { participant, reply })
            .await
    }

    /// Deletes the one tuple for `(participant, room_name)`, if present.
    pub async fn remove_room(
        &self,
        participant: ParticipantId,
        room_name: &str,
    ) -> Result<(), RegistryError> {
        let room_name = room_name.to_string();
        self.call(|reply| RegistryCommand::RemoveRoom {
            participant,
            room_name,
            reply,
        })
        .await
    }

    /// Queues a snapshot of the whole table to `path`.
    ///
    /// Returns once the request is accepted. The table is captured when the
    /// registry reaches the request; the file is written off the registry
    /// loop, so other calls are served meanwhile. Write failures are logged
    /// by the registry, not reported here. Writes happen in request order,
    /// and a later [`load`](Self::load) or [`shutdown`](Self::shutdown)
    /// waits for them, so it sees the finished file.
    pub async fn persist(&self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let command = RegistryCommand::Persist {
            path: path.as_ref().to_path_buf(),
        };
        match time::timeout(self.settings.call_timeout, self.sender.send(command)).await {
            Ok(Ok(())) => Ok(()),
            _ => Err(RegistryError::Unavailable),
        }
    }

    /// Replaces the whole table with the snapshot at `path`.
    ///
    /// Room ids are resolved through the rooms this registry already
    /// monitors, then through its [`RoomManager`] if it has one. Entries
    /// whose room can't be resolved, or has terminated, are dropped.
    /// Returns the number of tuples restored.
    ///
    /// # Errors
    /// [`RegistryError::Io`] if the file can't be read and
    /// [`RegistryError::Snapshot`] if it isn't a valid snapshot. The table
    /// is untouched on error.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<usize, RegistryError> {
        let path = path.as_ref().to_path_buf();
        self.call(|reply| RegistryCommand::Load { path, reply })
            .await?
    }

    pub async fn stats(&self) -> Result<RegistryStats, RegistryError> {
        self.call(|reply| RegistryCommand::Stats { reply }).await
    }

    /// Number of stored tuples.
    pub async fn len(&self) -> Result<usize, RegistryError> {
        Ok(self.stats().await?.records)
    }

    pub async fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.len().await? == 0)
    }

    /// Number of participants with at least one tuple.
    pub async fn participants(&self) -> Result<usize, RegistryError> {
        Ok(self.stats().await?.participants)
    }

    /// Number of rooms being watched.
    pub async fn monitored(&self) -> Result<usize, RegistryError> {
        Ok(self.stats().await?.monitored)
    }

    /// Stops the registry loop and all of its monitors. Other handles get
    /// [`RegistryError::Unavailable`] from then on.
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        self.call(|reply| RegistryCommand::Shutdown { reply }).await
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand<B>,
    ) -> Result<T, RegistryError> {
        let (tx, rx) = oneshot::channel();
        let request = async {
            self.sender.send(make(tx)).await.ok()?;
            rx.await.ok()
        };
        match time::timeout(self.settings.call_timeout, request).await {
            Ok(Some(value)) => Ok(value),
            _ => Err(RegistryError::Unavailable),
        }
    }
}

impl<B: RoomBehavior> Clone for Registry<B> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            settings: self.settings,
        }
    }
}

impl<B: RoomBehavior> fmt::Debug for Registry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("running", &self.is_running())
            .field("settings", &self.settings)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RegistryActor
// ---------------------------------------------------------------------------

struct RegistryActor<B: RoomBehavior, C: Codec> {
    table: HashMap<ParticipantId, Vec<Membership<B>>>,
    monitors: HashMap<RoomId, Monitor<B>>,
    rooms: Option<RoomManager<B>>,
    codec: Arc<C>,
    /// The most recent snapshot write. Each write waits for the one before.
    pending_write: Option<JoinHandle<()>>,
    receiver: mpsc::Receiver<RegistryCommand<B>>,
    weak: mpsc::WeakSender<RegistryCommand<B>>,
}

impl<B: RoomBehavior, C: Codec> RegistryActor<B, C> {
    async fn run(mut self) {
        tracing::info!("membership registry started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RegistryCommand::Add { record, reply } => {
                    self.handle_add(record);
                    let _ = reply.send(());
                }
                RegistryCommand::Lookup { participant, reply } => {
                    self.purge_dead();
                    let found = self.table.get(&participant).cloned().unwrap_or_default();
                    let _ = reply.send(found);
                }
                RegistryCommand::LookupRoom {
                    participant,
                    room_name,
                    reply,
                } => {
                    self.purge_dead();
                    let found = self
                        .find(participant, &room_name)
                        .map(|m| (m.handle.clone(), m.entered));
                    let _ = reply.send(found);
                }
                RegistryCommand::Update {
                    participant,
                    room_name,
                    entered,
                    reply,
                } => {
                    self.purge_dead();
                    let _ = reply.send(self.handle_update(participant, room_name, entered));
                }
                RegistryCommand::Remove { participant, reply } => {
                    self.handle_remove(participant);
                    let _ = reply.send(());
                }
                RegistryCommand::RemoveRoom {
                    participant,
                    room_name,
                    reply,
                } => {
                    self.handle_remove_room(participant, &room_name);
                    let _ = reply.send(());
                }
                RegistryCommand::Persist { path } => {
                    self.handle_persist(path);
                }
                RegistryCommand::Load { path, reply } => {
                    let result = self.handle_load(&path).await;
                    let _ = reply.send(result);
                }
                RegistryCommand::Stats { reply } => {
                    self.purge_dead();
                    let _ = reply.send(self.stats());
                }
                RegistryCommand::RoomDown { room_id } => {
                    self.purge_room(room_id);
                }
                RegistryCommand::Shutdown { reply } => {
                    tracing::info!("membership registry shutting down");
                    self.finish_writes().await;
                    let _ = reply.send(());
                    break;
                }
            }
        }

        self.finish_writes().await;
        tracing::info!(
            records = self.record_count(),
            monitored = self.monitors.len(),
            "membership registry stopped"
        );
    }

    fn handle_add(&mut self, record: RoomRecord<B>) {
        let (participant, membership) = record.into_membership();
        let room_id = membership.handle.room_id();
        self.ensure_monitored(&membership.handle);

        let entries = self.table.entry(participant).or_default();
        let existing = entries
            .iter()
            .position(|m| m.room_name == membership.room_name);
        match existing {
            Some(index) => {
                let replaced = std::mem::replace(&mut entries[index], membership);
                tracing::debug!(
                    %participant,
                    %room_id,
                    room_name = %replaced.room_name,
                    "room record replaced"
                );
                self.demonitor_if_unused(replaced.handle.room_id());
            }
            None => {
                tracing::debug!(
                    %participant,
                    %room_id,
                    room_name = %membership.room_name,
                    "room record added"
                );
                entries.push(membership);
            }
        }
    }

    fn handle_update(
        &mut self,
        participant: ParticipantId,
        room_name: String,
        entered: bool,
    ) -> Result<(), RegistryError> {
        let entry = self
            .table
            .get_mut(&participant)
            .and_then(|entries| entries.iter_mut().find(|m| m.room_name == room_name));

        match entry {
            Some(membership) => {
                membership.entered = entered;
                tracing::debug!(%participant, %room_name, entered, "room record updated");
                Ok(())
            }
            None => Err(RegistryError::NotFound {
                participant,
                room_name,
            }),
        }
    }

    fn handle_remove(&mut self, participant: ParticipantId) {
        let Some(entries) = self.table.remove(&participant) else {
            return;
        };
        tracing::debug!(%participant, removed = entries.len(), "participant removed");
        for membership in entries {
            self.demonitor_if_unused(membership.handle.room_id());
        }
    }

    fn handle_remove_room(&mut self, participant: ParticipantId, room_name: &str) {
        let Some(entries) = self.table.get_mut(&participant) else {
            return;
        };
        let Some(index) = entries.iter().position(|m| m.room_name == room_name) else {
            return;
        };

        let removed = entries.remove(index);
        if entries.is_empty() {
            self.table.remove(&participant);
        }
        tracing::debug!(%participant, %room_name, "room record removed");
        self.demonitor_if_unused(removed.handle.room_id());
    }

    /// Captures the table now and writes it on a separate task.
    fn handle_persist(&mut self, path: PathBuf) {
        self.purge_dead();
        let snapshot = self.snapshot();
        let records = snapshot.records.len();
        let codec = Arc::clone(&self.codec);
        let previous = self.pending_write.take();

        self.pending_write = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            match snapshot::write_snapshot(codec.as_ref(), &path, &snapshot).await {
                Ok(()) => {
                    tracing::info!(path = %path.display(), records, "registry snapshot written");
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "registry snapshot failed");
                }
            }
        }));
    }

    /// Waits for queued snapshot writes to land.
    async fn finish_writes(&mut self) {
        if let Some(write) = self.pending_write.take() {
            if let Err(e) = write.await {
                tracing::error!(error = %e, "registry snapshot task failed");
            }
        }
    }

    async fn handle_load(&mut self, path: &Path) -> Result<usize, RegistryError> {
        self.finish_writes().await;
        let snapshot = snapshot::read_snapshot(self.codec.as_ref(), path).await?;

        let mut table: HashMap<ParticipantId, Vec<Membership<B>>> = HashMap::new();
        let mut restored = 0;

        for entry in snapshot.records {
            let Some(handle) = self.resolve(entry.room_id).await else {
                tracing::warn!(
                    participant = %entry.participant,
                    room_id = %entry.room_id,
                    room_name = %entry.room_name,
                    "dropping snapshot entry for unknown or terminated room"
                );
                continue;
            };

            let membership = Membership {
                handle,
                room_name: entry.room_name,
                entered: entry.entered,
            };
            let entries = table.entry(entry.participant).or_default();
            let existing = entries
                .iter()
                .position(|m| m.room_name == membership.room_name);
            match existing {
                Some(index) => entries[index] = membership,
                None => {
                    entries.push(membership);
                    restored += 1;
                }
            }
        }

        self.table = table;

        let referenced: Vec<RoomHandle<B>> = self
            .table
            .values()
            .flatten()
            .map(|m| m.handle.clone())
            .collect();
        self.monitors
            .retain(|room_id, _| referenced.iter().any(|h| h.room_id() == *room_id));
        for handle in &referenced {
            self.ensure_monitored(handle);
        }

        tracing::info!(path = %path.display(), restored, "registry snapshot loaded");
        Ok(restored)
    }

    /// Turns a snapshot room id back into a live handle.
    async fn resolve(&mut self, room_id: RoomId) -> Option<RoomHandle<B>> {
        let monitored = self
            .monitors
            .get(&room_id)
            .map(|monitor| monitor.is_room_alive().then(|| monitor.handle().clone()));
        if let Some(handle) = monitored {
            return handle;
        }
        let rooms = self.rooms.clone()?;
        rooms.get(room_id).await
    }

    fn ensure_monitored(&mut self, handle: &RoomHandle<B>) {
        let room_id = handle.room_id();
        if self.monitors.contains_key(&room_id) {
            return;
        }
        tracing::debug!(%room_id, "monitoring room");
        self.monitors
            .insert(room_id, Monitor::watch(handle.clone(), self.weak.clone()));
    }

    fn demonitor_if_unused(&mut self, room_id: RoomId) {
        let in_use = self
            .table
            .values()
            .flatten()
            .any(|m| m.handle.room_id() == room_id);
        if !in_use && self.monitors.remove(&room_id).is_some() {
            tracing::debug!(%room_id, "room no longer monitored");
        }
    }

    /// Drops every tuple referencing `room_id` and stops watching it.
    fn purge_room(&mut self, room_id: RoomId) {
        let mut purged = 0;
        self.table.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|m| m.handle.room_id() != room_id);
            purged += before - entries.len();
            !entries.is_empty()
        });
        self.monitors.remove(&room_id);
        if purged > 0 {
            tracing::info!(%room_id, purged, "purged records of terminated room");
        }
    }

    /// Purges rooms that have terminated but whose monitor hasn't reported
    /// yet, so reads never return them.
    fn purge_dead(&mut self) {
        let dead: Vec<RoomId> = self
            .monitors
            .values()
            .filter(|monitor| !monitor.is_room_alive())
            .map(Monitor::room_id)
            .collect();
        for room_id in dead {
            self.purge_room(room_id);
        }
    }

    fn find(&self, participant: ParticipantId, room_name: &str) -> Option<&Membership<B>> {
        self.table
            .get(&participant)?
            .iter()
            .find(|m| m.room_name == room_name)
    }

    fn snapshot(&self) -> SnapshotFile {
        let mut participants: Vec<&ParticipantId> = self.table.keys().collect();
        participants.sort();

        let records = participants
            .into_iter()
            .flat_map(|participant| {
                self.table[participant].iter().map(move |m| SnapshotEntry {
                    participant: *participant,
                    room_id: m.handle.room_id(),
                    room_name: m.room_name.clone(),
                    entered: m.entered,
                })
            })
            .collect();
        SnapshotFile::new(records)
    }

    fn record_count(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }

    fn stats(&self) -> RegistryStats {
        RegistryStats {
            participants: self.table.len(),
            records: self.record_count(),
            monitored: self.monitors.len(),
        }
    }
}
