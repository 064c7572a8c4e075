//! Integration tests for room actors using an in-memory chat behavior.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use roomkit_protocol::{ParticipantId, SearchParams};
use roomkit_room::{
    RoomBehavior, RoomConfig, RoomError, RoomHandle, RoomLifecycle, RoomManager,
    RoomSettings, spawn_room,
};
use tokio::time::Instant;

// =========================================================================
// Mock behavior: a chat room kept entirely in its state value.
// =========================================================================

#[derive(Default)]
struct MockChat {
    fail_close: bool,
    fail_persist: bool,
    closes: AtomicUsize,
    persists: AtomicUsize,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct ChatState {
    name: Option<String>,
    admins: Vec<u64>,
    members: Vec<u64>,
    invited: Vec<u64>,
    log: Vec<(u64, String)>,
}

impl RoomBehavior for MockChat {
    type State = ChatState;
    type Member = u64;
    type Message = String;
    type History = Vec<(u64, String)>;
    type Record = String;

    async fn create(
        &self,
        admin: &u64,
        name: Option<&str>,
        mut state: ChatState,
    ) -> Result<ChatState, String> {
        if state.name.is_some() {
            return Err("room already created".into());
        }
        state.name = Some(name.map_or_else(|| format!("room-{admin}"), str::to_string));
        state.admins.push(*admin);
        state.members.push(*admin);
        Ok(state)
    }

    async fn list(&self, participant: ParticipantId) -> Vec<String> {
        vec![format!("rooms-of-{}", participant.0)]
    }

    async fn list_members(&self, state: &ChatState) -> Vec<u64> {
        state.members.clone()
    }

    async fn add_member(
        &self,
        member: &u64,
        _kind: &str,
        admin: bool,
        mut state: ChatState,
    ) -> Result<ChatState, String> {
        if state.members.contains(member) {
            return Err("already a member".into());
        }
        state.members.push(*member);
        if admin {
            state.admins.push(*member);
        }
        Ok(state)
    }

    async fn remove_member(&self, member: &u64, mut state: ChatState) -> Result<ChatState, String> {
        if !state.members.contains(member) {
            return Err("not a member".into());
        }
        state.members.retain(|m| m != member);
        state.admins.retain(|m| m != member);
        Ok(state)
    }

    async fn is_member(&self, member: &u64, state: &ChatState) -> bool {
        state.members.contains(member)
    }

    async fn is_admin(&self, member: &u64, state: &ChatState) -> bool {
        state.admins.contains(member)
    }

    async fn invite_member(&self, member: &u64, mut state: ChatState) -> Result<ChatState, String> {
        if state.invited.contains(member) {
            return Err("already invited".into());
        }
        state.invited.push(*member);
        Ok(state)
    }

    async fn send_message(
        &self,
        member: &u64,
        message: String,
        mut state: ChatState,
    ) -> Result<ChatState, String> {
        if !state.members.contains(member) {
            return Err("not a member".into());
        }
        state.log.push((*member, message));
        Ok(state)
    }

    async fn messages(&self, state: &ChatState) -> Vec<(u64, String)> {
        state.log.clone()
    }

    async fn search_room(&self, params: &SearchParams) -> Vec<String> {
        params.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    async fn close(&self, _state: &ChatState) -> Result<(), String> {
        if self.fail_close {
            return Err("backend refused to close".into());
        }
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn persist(&self, _state: &ChatState) -> Result<(), String> {
        if self.fail_persist {
            return Err("disk full".into());
        }
        self.persists.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn spawn_chat(behavior: MockChat) -> (Arc<MockChat>, RoomHandle<MockChat>) {
    let behavior = Arc::new(behavior);
    let handle = spawn_room(
        Arc::clone(&behavior),
        ChatState::default(),
        RoomSettings::default(),
    );
    (behavior, handle)
}

/// A room created by admin 1 with members 1 and 2.
async fn general_room() -> (Arc<MockChat>, RoomHandle<MockChat>) {
    let (behavior, room) = spawn_chat(MockChat::default());
    room.create(1, Some("general".into())).await.unwrap();
    room.add_member(2, "member", false).await.unwrap();
    (behavior, room)
}

// =========================================================================
// Config access
// =========================================================================

#[tokio::test]
async fn test_get_config_returns_initial_state() {
    let (_, room) = spawn_chat(MockChat::default());

    let config = room.get_config().await.unwrap();

    assert_eq!(config.state, ChatState::default());
}

#[tokio::test]
async fn test_set_config_replaces_state_and_advances_version() {
    let (behavior, room) = spawn_chat(MockChat::default());
    let state = ChatState {
        name: Some("set".into()),
        ..ChatState::default()
    };

    let version = room
        .set_config(RoomConfig::new(behavior, state.clone()))
        .await
        .unwrap();

    assert_eq!(version, 1);
    assert_eq!(room.get_config().await.unwrap().state, state);
}

#[tokio::test]
async fn test_behavior_returns_current_behavior() {
    let (behavior, room) = spawn_chat(MockChat::default());

    let current = room.behavior().await.unwrap();

    assert!(Arc::ptr_eq(&behavior, &current));
}

// =========================================================================
// Call surface
// =========================================================================

#[tokio::test]
async fn test_create_returns_new_state() {
    let (_, room) = spawn_chat(MockChat::default());

    let state = room.create(7, None).await.unwrap();

    assert_eq!(state.name.as_deref(), Some("room-7"));
    assert_eq!(state.admins, vec![7]);
    assert_eq!(room.get_config().await.unwrap().state, state);
}

#[tokio::test]
async fn test_add_member_then_list_members() {
    let (_, room) = general_room().await;

    let members = room.list_members().await.unwrap();

    assert_eq!(members, vec![1, 2]);
}

#[tokio::test]
async fn test_is_member_reflects_membership() {
    let (_, room) = general_room().await;

    assert!(room.is_member(2).await.unwrap());
    assert!(!room.is_member(3).await.unwrap());
}

#[tokio::test]
async fn test_remove_member_success() {
    let (_, room) = general_room().await;

    room.remove_member(2).await.unwrap();

    assert!(!room.is_member(2).await.unwrap());
}

#[tokio::test]
async fn test_remove_member_not_a_member_returns_adapter_error() {
    let (_, room) = general_room().await;

    let result = room.remove_member(9).await;

    assert!(
        matches!(&result, Err(RoomError::Adapter { reason, .. }) if reason == "not a member"),
        "got {result:?}"
    );
}

#[tokio::test]
async fn test_send_message_then_messages() {
    let (_, room) = general_room().await;

    room.send_message(1, "hello".into()).await.unwrap();
    room.send_message(2, "hi".into()).await.unwrap();

    let history = room.messages().await.unwrap();
    assert_eq!(
        history,
        vec![(1, "hello".to_string()), (2, "hi".to_string())]
    );
}

#[tokio::test]
async fn test_send_message_from_non_member_is_rejected() {
    let (_, room) = general_room().await;

    let result = room.send_message(5, "spam".into()).await;

    assert!(matches!(result, Err(RoomError::Adapter { .. })));
    assert!(room.messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invite_member_twice_is_rejected() {
    let (_, room) = general_room().await;

    room.invite_member(3).await.unwrap();
    let result = room.invite_member(3).await;

    assert!(matches!(result, Err(RoomError::Adapter { .. })));
    assert_eq!(room.get_config().await.unwrap().state.invited, vec![3]);
}

#[tokio::test]
async fn test_search_room_passes_params_through() {
    let (_, room) = general_room().await;
    let params = SearchParams::new().with("name", "general");

    let hits = room.search_room(params).await.unwrap();

    assert_eq!(hits, vec!["name=general".to_string()]);
}

#[tokio::test]
async fn test_list_uses_behavior_directory() {
    let (_, room) = general_room().await;

    let names = room.list(ParticipantId(4)).await.unwrap();

    assert_eq!(names, vec!["rooms-of-4".to_string()]);
}

#[tokio::test]
async fn test_persist_calls_behavior_without_touching_state() {
    let (behavior, room) = general_room().await;
    let before = room.status().await.unwrap().version;

    room.persist().await.unwrap();

    assert_eq!(behavior.persists.load(Ordering::SeqCst), 1);
    assert_eq!(room.status().await.unwrap().version, before);
}

#[tokio::test]
async fn test_persist_failure_returns_adapter_error() {
    let (_, room) = spawn_chat(MockChat {
        fail_persist: true,
        ..MockChat::default()
    });

    let result = room.persist().await;

    assert!(
        matches!(&result, Err(RoomError::Adapter { reason, .. }) if reason == "disk full"),
        "got {result:?}"
    );
}

// =========================================================================
// forward() atomicity
// =========================================================================

#[tokio::test]
async fn test_forward_success_advances_version_exactly_once() {
    let (_, room) = general_room().await;
    let before = room.status().await.unwrap().version;

    room.send_message(1, "one".into()).await.unwrap();

    assert_eq!(room.status().await.unwrap().version, before + 1);
}

#[tokio::test]
async fn test_forward_error_leaves_state_identical() {
    let (_, room) = general_room().await;
    let before = room.status().await.unwrap();

    let result = room.add_member(2, "member", false).await;

    assert!(matches!(result, Err(RoomError::Adapter { .. })));
    let after = room.status().await.unwrap();
    assert_eq!(after.config.state, before.config.state);
    assert_eq!(after.version, before.version);
}

#[tokio::test]
async fn test_forward_custom_operation() {
    let (_, room) = general_room().await;

    let state = room
        .forward(|_, mut state| async move {
            state.name = Some("renamed".into());
            Ok(state)
        })
        .await
        .unwrap();

    assert_eq!(state.name.as_deref(), Some("renamed"));
    assert_eq!(
        room.get_config().await.unwrap().state.name.as_deref(),
        Some("renamed")
    );
}

// =========================================================================
// Close handshake
// =========================================================================

#[tokio::test]
async fn test_close_by_non_admin_returns_not_admin_and_room_keeps_running() {
    let (behavior, room) = general_room().await;

    let result = room.close(&2).await;

    assert!(matches!(result, Err(RoomError::NotAdmin { .. })));
    assert_eq!(behavior.closes.load(Ordering::SeqCst), 0);
    assert!(room.get_config().await.is_ok(), "room should still answer");
    assert_eq!(room.lifecycle(), RoomLifecycle::Running);
}

#[tokio::test]
async fn test_close_by_admin_runs_behavior_close_and_terminates() {
    let (behavior, room) = general_room().await;

    room.close(&1).await.unwrap();

    assert_eq!(behavior.closes.load(Ordering::SeqCst), 1);
    tokio::time::timeout(Duration::from_secs(1), room.terminated())
        .await
        .expect("room should terminate after close");
    assert_eq!(room.lifecycle(), RoomLifecycle::Terminated);
}

#[tokio::test]
async fn test_get_config_after_close_is_unreachable_within_call_timeout() {
    let (_, room) = general_room().await;
    room.close(&1).await.unwrap();

    let start = Instant::now();
    let result = room.get_config().await;

    assert!(matches!(result, Err(RoomError::Unreachable(id)) if id == room.room_id()));
    assert!(start.elapsed() <= Duration::from_millis(450));
}

#[tokio::test]
async fn test_close_when_behavior_refuses_keeps_room_running() {
    let (_, room) = spawn_chat(MockChat {
        fail_close: true,
        ..MockChat::default()
    });
    room.create(1, None).await.unwrap();

    let result = room.close(&1).await;

    assert!(matches!(result, Err(RoomError::Adapter { .. })));
    assert!(room.is_alive());
    assert!(room.get_config().await.is_ok());
}

#[tokio::test]
async fn test_close_dead_room_is_unreachable() {
    let (_, room) = general_room().await;
    room.shutdown().await.unwrap();
    room.terminated().await;

    let result = room.close(&1).await;

    assert!(matches!(result, Err(RoomError::Unreachable(_))));
}

#[tokio::test]
async fn test_identify_live_room_succeeds() {
    let (_, room) = general_room().await;

    room.identify().await.unwrap();
}

// =========================================================================
// Unknown requests and introspection
// =========================================================================

#[tokio::test]
async fn test_unknown_request_is_ignored_and_room_keeps_running() {
    let (_, room) = general_room().await;
    let before = room.status().await.unwrap();

    room.send_raw("reload-everything").await.unwrap();
    room.send_raw(42_u32).await.unwrap();

    let after = room.status().await.unwrap();
    assert_eq!(after.config.state, before.config.state);
    assert_eq!(after.version, before.version);
    // Two unknown requests plus the status call itself.
    assert_eq!(after.processed, before.processed + 3);
}

#[tokio::test]
async fn test_replace_rewrites_state_in_place() {
    let (_, room) = general_room().await;
    let before = room.status().await.unwrap().version;

    let config = room
        .replace(|config| {
            let mut state = config.state.clone();
            state.members.push(99);
            config.with_state(state)
        })
        .await
        .unwrap();

    assert!(config.state.members.contains(&99));
    let status = room.status().await.unwrap();
    assert_eq!(status.version, before + 1);
    assert!(status.config.state.members.contains(&99));
}

#[tokio::test]
async fn test_replace_can_swap_behavior() {
    let (_, room) = general_room().await;
    let upgraded = Arc::new(MockChat {
        fail_persist: true,
        ..MockChat::default()
    });
    let swap_in = Arc::clone(&upgraded);

    room.replace(move |config| RoomConfig::new(swap_in, config.state))
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&room.behavior().await.unwrap(), &upgraded));
    assert!(room.persist().await.is_err(), "new behavior should be in effect");
}

#[tokio::test]
async fn test_replace_panic_keeps_previous_state() {
    let (_, room) = general_room().await;
    let before = room.status().await.unwrap();

    let result = room
        .replace(|_| panic!("upgrade script crashed"))
        .await;

    assert!(
        matches!(&result, Err(RoomError::ReplaceFailed { reason, .. }) if reason.contains("crashed")),
        "got {result:?}"
    );
    let after = room.status().await.unwrap();
    assert_eq!(after.config.state, before.config.state);
    assert_eq!(after.version, before.version);
}

// =========================================================================
// RoomManager
// =========================================================================

fn manager() -> RoomManager<MockChat> {
    RoomManager::new(Arc::new(MockChat::default()), RoomSettings::default())
}

#[tokio::test]
async fn test_manager_create_room_returns_unique_ids() {
    let mgr = manager();

    let a = mgr.create_room().await;
    let b = mgr.create_room().await;

    assert_ne!(a.room_id(), b.room_id());
    assert_eq!(mgr.room_count().await, 2);
}

#[tokio::test]
async fn test_manager_get_resolves_live_room() {
    let mgr = manager();
    let room = mgr.create_room().await;

    let found = mgr.get(room.room_id()).await;

    assert_eq!(found, Some(room));
}

#[tokio::test]
async fn test_manager_drops_terminated_rooms() {
    let mgr = manager();
    let room = mgr.create_room().await;
    room.create(1, None).await.unwrap();

    room.close(&1).await.unwrap();
    room.terminated().await;

    assert_eq!(mgr.get(room.room_id()).await, None);
    assert_eq!(mgr.room_count().await, 0);
}

#[tokio::test]
async fn test_manager_destroy_room() {
    let mgr = manager();
    let room = mgr.create_room().await;

    mgr.destroy_room(room.room_id()).await.unwrap();
    room.terminated().await;

    assert!(!room.is_alive());
    assert!(mgr.room_ids().await.is_empty());
}

#[tokio::test]
async fn test_manager_destroy_room_not_found() {
    let mgr = manager();
    let other = spawn_room(
        Arc::new(MockChat::default()),
        ChatState::default(),
        RoomSettings::default(),
    );

    let result = mgr.destroy_room(other.room_id()).await;

    assert!(matches!(result, Err(RoomError::NotFound(_))));
}

#[tokio::test]
async fn test_manager_clones_share_rooms() {
    let mgr = manager();
    let clone = mgr.clone();

    let room = mgr.create_room().await;

    assert_eq!(clone.get(room.room_id()).await, Some(room));
}
