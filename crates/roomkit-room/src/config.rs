//! Room configuration, actor settings, and lifecycle state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RoomBehavior;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// The `(behavior, state)` pair a room actor owns.
///
/// Only the owning actor ever mutates it; callers receive clones through
/// [`RoomHandle::get_config`](crate::RoomHandle::get_config) and hand back
/// replacements through
/// [`RoomHandle::set_config`](crate::RoomHandle::set_config).
pub struct RoomConfig<B: RoomBehavior> {
    /// The backend serving this room.
    pub behavior: Arc<B>,
    /// The backend's per-room state.
    pub state: B::State,
}

impl<B: RoomBehavior> RoomConfig<B> {
    pub fn new(behavior: Arc<B>, state: B::State) -> Self {
        Self { behavior, state }
    }

    /// Returns a config with the same behavior and a different state.
    pub fn with_state(&self, state: B::State) -> Self {
        Self {
            behavior: Arc::clone(&self.behavior),
            state,
        }
    }
}

impl<B: RoomBehavior> Clone for RoomConfig<B> {
    fn clone(&self) -> Self {
        Self {
            behavior: Arc::clone(&self.behavior),
            state: self.state.clone(),
        }
    }
}

impl<B: RoomBehavior> fmt::Debug for RoomConfig<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomConfig")
            .field("behavior", &std::any::type_name::<B>())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RoomSettings
// ---------------------------------------------------------------------------

/// Timeouts and mailbox sizing for a room actor and its handles.
///
/// Every request a handle makes is bounded by one of these timeouts, so
/// a dead or wedged room surfaces as [`RoomError::Unreachable`](crate::RoomError::Unreachable)
/// instead of a hung caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Bound on request/reply calls (config fetch, config update, status).
    pub call_timeout: Duration,

    /// Bound on the identify probe during the close handshake.
    pub identify_timeout: Duration,

    /// Mailbox capacity. Senders wait when it's full.
    pub channel_size: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(400),
            identify_timeout: Duration::from_millis(100),
            channel_size: 64,
        }
    }
}

impl RoomSettings {
    /// Fixes values that would break the actor.
    ///
    /// A zero `channel_size` is raised to 1 (Tokio rejects zero-capacity
    /// channels). Called by [`spawn_room`](crate::spawn_room).
    pub fn validated(mut self) -> Self {
        if self.channel_size == 0 {
            tracing::warn!("room channel_size of 0 raised to 1");
            self.channel_size = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RoomLifecycle
// ---------------------------------------------------------------------------

/// The lifecycle of a room actor.
///
/// ```text
/// Running ──(shutdown directive)──→ Terminated
/// ```
///
/// There is no way back: a terminated room's handle stays unreachable
/// forever and a new room must be spawned instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomLifecycle {
    Running,
    Terminated,
}

impl RoomLifecycle {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for RoomLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_settings_default_timeouts() {
        let settings = RoomSettings::default();
        assert_eq!(settings.call_timeout, Duration::from_millis(400));
        assert_eq!(settings.identify_timeout, Duration::from_millis(100));
        assert_eq!(settings.channel_size, 64);
    }

    #[test]
    fn test_room_settings_validated_raises_zero_channel_size() {
        let settings = RoomSettings {
            channel_size: 0,
            ..RoomSettings::default()
        }
        .validated();
        assert_eq!(settings.channel_size, 1);
    }

    #[test]
    fn test_room_settings_deserializes_from_json() {
        let json = r#"{
            "call_timeout": {"secs": 1, "nanos": 0},
            "identify_timeout": {"secs": 0, "nanos": 50000000},
            "channel_size": 8
        }"#;
        let settings: RoomSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.call_timeout, Duration::from_secs(1));
        assert_eq!(settings.identify_timeout, Duration::from_millis(50));
        assert_eq!(settings.channel_size, 8);
    }

    #[test]
    fn test_room_lifecycle_display() {
        assert_eq!(RoomLifecycle::Running.to_string(), "Running");
        assert_eq!(RoomLifecycle::Terminated.to_string(), "Terminated");
        assert!(!RoomLifecycle::Terminated.is_running());
    }
}
