//! Room actor: an isolated Tokio task that owns one room's
//! `(behavior, state)` pair.
//!
//! The actor never runs behavior code itself. It serializes reads and
//! writes of its config, answers liveness probes, and stops on request.
//! Behavior calls run on the caller's task through [`RoomHandle::forward`]
//! and [`RoomHandle::query`], so a slow backend never blocks the mailbox.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use roomkit_protocol::RoomId;
use tokio::sync::{mpsc, oneshot};
use tokio::time;

use crate::{RoomBehavior, RoomConfig, RoomError, RoomLifecycle, RoomSettings};

/// Counter for generating unique room IDs.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// A state rewrite applied inside the actor by [`RoomHandle::replace`].
type ReplaceFn<B> = Box<dyn FnOnce(RoomConfig<B>) -> RoomConfig<B> + Send>;

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` are calls: the handle waits
/// (bounded by a timeout) for the actor's answer on that channel.
pub(crate) enum RoomCommand<B: RoomBehavior> {
    /// Read the current config.
    GetConfig {
        reply: oneshot::Sender<RoomConfig<B>>,
    },

    /// Replace the config wholesale. Replies with the new state version.
    SetConfig {
        config: RoomConfig<B>,
        reply: oneshot::Sender<u64>,
    },

    /// Liveness probe used by the close handshake.
    Identify { reply: oneshot::Sender<RoomId> },

    /// Read config plus actor bookkeeping, for tooling.
    Status {
        reply: oneshot::Sender<RoomStatus<B>>,
    },

    /// Rewrite the config with a pure function, for live upgrades.
    Replace {
        rewrite: ReplaceFn<B>,
        reply: oneshot::Sender<Result<RoomConfig<B>, String>>,
    },

    /// Anything the actor doesn't understand. Logged and dropped.
    Unknown(Box<dyn Any + Send>),

    /// Stop the actor. Nothing queued behind it is processed.
    Shutdown,
}

/// A point-in-time view of a running room, returned by
/// [`RoomHandle::status`].
pub struct RoomStatus<B: RoomBehavior> {
    pub room_id: RoomId,
    pub config: RoomConfig<B>,
    /// Number of times the config was replaced. Advances by exactly one
    /// per successful `set_config` or `replace`.
    pub version: u64,
    /// Requests handled so far, including unknown ones.
    pub processed: u64,
}

impl<B: RoomBehavior> fmt::Debug for RoomStatus<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomStatus")
            .field("room_id", &self.room_id)
            .field("config", &self.config)
            .field("version", &self.version)
            .field("processed", &self.processed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a room actor, live or dead.
///
/// Cheap to clone (an `mpsc::Sender` plus the room id). Two handles are
/// equal when they point at the same actor; equality and hashing only
/// look at the [`RoomId`].
pub struct RoomHandle<B: RoomBehavior> {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand<B>>,
    settings: RoomSettings,
}

impl<B: RoomBehavior> RoomHandle<B> {
    /// Returns the room's unique ID.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Returns the timeouts this handle applies to its calls.
    pub fn settings(&self) -> RoomSettings {
        self.settings
    }

    /// Returns `false` once the actor has stopped and dropped its mailbox.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    pub fn lifecycle(&self) -> RoomLifecycle {
        if self.is_alive() {
            RoomLifecycle::Running
        } else {
            RoomLifecycle::Terminated
        }
    }

    /// Resolves once the actor has terminated, for whatever reason
    /// (shutdown directive, panic, runtime teardown).
    ///
    /// Resolves immediately for an already-dead room.
    pub async fn terminated(&self) {
        self.sender.closed().await;
    }

    /// Fetches the current `(behavior, state)` pair.
    ///
    /// # Errors
    /// [`RoomError::Unreachable`] if the room is dead or silent for
    /// longer than `call_timeout`.
    pub async fn get_config(&self) -> Result<RoomConfig<B>, RoomError> {
        self.call(self.settings.call_timeout, |reply| RoomCommand::GetConfig {
            reply,
        })
        .await
    }

    /// Replaces the `(behavior, state)` pair and returns the new state
    /// version.
    pub async fn set_config(&self, config: RoomConfig<B>) -> Result<u64, RoomError> {
        self.call(self.settings.call_timeout, |reply| RoomCommand::SetConfig {
            config,
            reply,
        })
        .await
    }

    /// Returns the room's config together with its version and request
    /// counters.
    pub async fn status(&self) -> Result<RoomStatus<B>, RoomError> {
        self.call(self.settings.call_timeout, |reply| RoomCommand::Status {
            reply,
        })
        .await
    }

    /// Rewrites the config inside the actor with `rewrite`, without
    /// restarting the room. Returns the config now in effect.
    ///
    /// `rewrite` runs on the actor's task between two requests, so it
    /// sees and produces a consistent value. If it panics the old config
    /// stays in place and [`RoomError::ReplaceFailed`] is returned.
    pub async fn replace<F>(&self, rewrite: F) -> Result<RoomConfig<B>, RoomError>
    where
        F: FnOnce(RoomConfig<B>) -> RoomConfig<B> + Send + 'static,
    {
        let rewrite: ReplaceFn<B> = Box::new(rewrite);
        let result = self
            .call(self.settings.call_timeout, |reply| RoomCommand::Replace {
                rewrite,
                reply,
            })
            .await?;
        result.map_err(|reason| RoomError::ReplaceFailed {
            room_id: self.room_id,
            reason,
        })
    }

    /// Probes the actor with an identify request.
    ///
    /// Succeeds only if this exact room answers within
    /// `identify_timeout`.
    pub async fn identify(&self) -> Result<(), RoomError> {
        let answered = self
            .call(self.settings.identify_timeout, |reply| RoomCommand::Identify {
                reply,
            })
            .await?;
        if answered != self.room_id {
            tracing::warn!(
                room_id = %self.room_id,
                %answered,
                "identify answered by a different room"
            );
            return Err(RoomError::Unreachable(self.room_id));
        }
        Ok(())
    }

    /// Sends the shutdown directive. The actor stops after handling
    /// whatever was queued before it.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        match time::timeout(
            self.settings.call_timeout,
            self.sender.send(RoomCommand::Shutdown),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            _ => Err(RoomError::Unreachable(self.room_id)),
        }
    }

    /// Delivers an arbitrary value to the actor's mailbox.
    ///
    /// Rooms only understand their own command set, so the actor logs the
    /// value as an unknown request and keeps running. The sender gets no
    /// answer beyond mailbox acceptance.
    pub async fn send_raw<T: Any + Send>(&self, message: T) -> Result<(), RoomError> {
        match time::timeout(
            self.settings.call_timeout,
            self.sender.send(RoomCommand::Unknown(Box::new(message))),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            _ => Err(RoomError::Unreachable(self.room_id)),
        }
    }

    /// Applies a state-changing behavior operation to this room.
    ///
    /// Fetches the config, runs `op(behavior, state)` on the caller's
    /// task, and on `Ok(new_state)` stores the new state with
    /// [`set_config`](Self::set_config). On `Err(reason)` nothing is
    /// written and [`RoomError::Adapter`] is returned, so a successful
    /// call advances the room's state version exactly once and a failed
    /// one not at all.
    ///
    /// Concurrent forwards on one room are last-writer-wins: each reads
    /// the state, and the later `set_config` replaces the earlier one.
    pub async fn forward<F, Fut>(&self, op: F) -> Result<B::State, RoomError>
    where
        F: FnOnce(Arc<B>, B::State) -> Fut + Send,
        Fut: Future<Output = Result<B::State, String>> + Send,
    {
        let RoomConfig { behavior, state } = self.get_config().await?;
        match op(Arc::clone(&behavior), state).await {
            Ok(next) => {
                let version = self
                    .set_config(RoomConfig::new(behavior, next.clone()))
                    .await?;
                tracing::debug!(room_id = %self.room_id, version, "room state advanced");
                Ok(next)
            }
            Err(reason) => {
                tracing::debug!(
                    room_id = %self.room_id,
                    %reason,
                    "behavior rejected operation"
                );
                Err(RoomError::Adapter {
                    room_id: self.room_id,
                    reason,
                })
            }
        }
    }

    /// Runs a read-only behavior operation against the current state.
    ///
    /// The result is returned as-is and the room is never written to.
    pub async fn query<T, F, Fut>(&self, op: F) -> Result<T, RoomError>
    where
        F: FnOnce(Arc<B>, B::State) -> Fut + Send,
        Fut: Future<Output = T> + Send,
    {
        let RoomConfig { behavior, state } = self.get_config().await?;
        Ok(op(behavior, state).await)
    }

    /// Closes the room on behalf of `member`.
    ///
    /// The handshake has four steps, each with its own failure:
    ///
    /// 1. fetch the config and ask the behavior whether `member` is an
    ///    admin ([`RoomError::NotAdmin`] if not; the room keeps running),
    /// 2. probe the actor with identify ([`RoomError::Unreachable`] if it
    ///    doesn't answer within `identify_timeout`),
    /// 3. let the behavior release the room ([`RoomError::Adapter`] if it
    ///    refuses; the room keeps running so the close can be retried),
    /// 4. send the shutdown directive.
    pub async fn close(&self, member: &B::Member) -> Result<(), RoomError> {
        let RoomConfig { behavior, state } = self.get_config().await?;

        if !behavior.is_admin(member, &state).await {
            tracing::debug!(room_id = %self.room_id, ?member, "close refused: not an admin");
            return Err(RoomError::NotAdmin {
                room_id: self.room_id,
                member: format!("{member:?}"),
            });
        }

        self.identify().await?;

        behavior
            .close(&state)
            .await
            .map_err(|reason| RoomError::Adapter {
                room_id: self.room_id,
                reason,
            })?;

        self.shutdown().await?;
        tracing::info!(room_id = %self.room_id, ?member, "room closed");
        Ok(())
    }

    /// Sends a command carrying a reply channel and waits for the answer.
    ///
    /// Both the enqueue and the reply are covered by `timeout`. A closed
    /// mailbox, a dropped reply channel, and an expired timeout all map to
    /// [`RoomError::Unreachable`].
    async fn call<T>(
        &self,
        timeout: Duration,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand<B>,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let cmd = command(reply_tx);
        let exchange = async {
            self.sender.send(cmd).await.ok()?;
            reply_rx.await.ok()
        };

        match time::timeout(timeout, exchange).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(RoomError::Unreachable(self.room_id)),
            Err(_) => {
                tracing::debug!(
                    room_id = %self.room_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "room call timed out"
                );
                Err(RoomError::Unreachable(self.room_id))
            }
        }
    }
}

impl<B: RoomBehavior> Clone for RoomHandle<B> {
    fn clone(&self) -> Self {
        Self {
            room_id: self.room_id,
            sender: self.sender.clone(),
            settings: self.settings,
        }
    }
}

impl<B: RoomBehavior> PartialEq for RoomHandle<B> {
    fn eq(&self, other: &Self) -> bool {
        self.room_id == other.room_id
    }
}

impl<B: RoomBehavior> Eq for RoomHandle<B> {}

impl<B: RoomBehavior> Hash for RoomHandle<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.room_id.hash(state);
    }
}

impl<B: RoomBehavior> fmt::Debug for RoomHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomHandle")
            .field("room_id", &self.room_id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<B: RoomBehavior> {
    room_id: RoomId,
    config: RoomConfig<B>,
    version: u64,
    processed: u64,
    receiver: mpsc::Receiver<RoomCommand<B>>,
}

impl<B: RoomBehavior> RoomActor<B> {
    /// Runs the actor loop, processing commands until shutdown.
    ///
    /// Dropping `self` at the end closes the mailbox, which is what
    /// [`RoomHandle::terminated`] waits for.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            self.processed += 1;
            match cmd {
                RoomCommand::GetConfig { reply } => {
                    let _ = reply.send(self.config.clone());
                }
                RoomCommand::SetConfig { config, reply } => {
                    self.config = config;
                    self.version += 1;
                    let _ = reply.send(self.version);
                }
                RoomCommand::Identify { reply } => {
                    let _ = reply.send(self.room_id);
                }
                RoomCommand::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                RoomCommand::Replace { rewrite, reply } => {
                    let result = self.handle_replace(rewrite);
                    let _ = reply.send(result);
                }
                RoomCommand::Unknown(message) => {
                    tracing::warn!(
                        room_id = %self.room_id,
                        type_id = ?(*message).type_id(),
                        "unknown request, ignoring"
                    );
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_id = %self.room_id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(
            room_id = %self.room_id,
            processed = self.processed,
            "room actor stopped"
        );
    }

    fn handle_replace(&mut self, rewrite: ReplaceFn<B>) -> Result<RoomConfig<B>, String> {
        let current = self.config.clone();
        match panic::catch_unwind(AssertUnwindSafe(move || rewrite(current))) {
            Ok(next) => {
                self.config = next;
                self.version += 1;
                tracing::info!(
                    room_id = %self.room_id,
                    version = self.version,
                    "room config replaced"
                );
                Ok(self.config.clone())
            }
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                tracing::warn!(room_id = %self.room_id, %reason, "room config rewrite panicked");
                Err(reason)
            }
        }
    }

    fn status(&self) -> RoomStatus<B> {
        RoomStatus {
            room_id: self.room_id,
            config: self.config.clone(),
            version: self.version,
            processed: self.processed,
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rewrite panicked".to_string()
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// The room starts `Running` with `(behavior, state)` as its config and
/// state version 0. Must be called from within a Tokio runtime.
pub fn spawn_room<B: RoomBehavior>(
    behavior: Arc<B>,
    state: B::State,
    settings: RoomSettings,
) -> RoomHandle<B> {
    let settings = settings.validated();
    let room_id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
    let (tx, rx) = mpsc::channel(settings.channel_size);

    let actor = RoomActor {
        room_id,
        config: RoomConfig::new(behavior, state),
        version: 0,
        processed: 0,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
        settings,
    }
}
