use std::collections::HashMap;
use std::sync::Mutex;

use roomkit::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chat types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Room {
    name: String,
    admins: Vec<ParticipantId>,
    members: Vec<ParticipantId>,
    invited: Vec<ParticipantId>,
    log: Vec<Line>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Line {
    from: ParticipantId,
    text: String,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Keeps every room in process memory. `directory` maps room names to
/// members for `list` and `search_room`; `saved` holds the JSON written
/// by `persist`.
#[derive(Default)]
struct MemoryChat {
    directory: Mutex<HashMap<String, Vec<ParticipantId>>>,
    saved: Mutex<HashMap<String, String>>,
}

impl MemoryChat {
    fn index(&self, room: &Room) {
        if let Ok(mut directory) = self.directory.lock() {
            directory.insert(room.name.clone(), room.members.clone());
        }
    }
}

impl RoomBehavior for MemoryChat {
    type State = Room;
    type Member = ParticipantId;
    type Message = String;
    type History = Vec<Line>;
    type Record = String;

    async fn create(
        &self,
        admin: &ParticipantId,
        name: Option<&str>,
        mut room: Room,
    ) -> Result<Room, String> {
        if !room.name.is_empty() {
            return Err(format!("room {} already exists", room.name));
        }
        room.name = name.map_or_else(|| format!("room-of-{admin}"), str::to_string);
        room.admins.push(*admin);
        room.members.push(*admin);
        self.index(&room);
        Ok(room)
    }

    async fn list(&self, participant: ParticipantId) -> Vec<String> {
        let Ok(directory) = self.directory.lock() else {
            return Vec::new();
        };
        let mut names: Vec<String> = directory
            .iter()
            .filter(|(_, members)| members.contains(&participant))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    async fn list_members(&self, room: &Room) -> Vec<ParticipantId> {
        room.members.clone()
    }

    async fn add_member(
        &self,
        member: &ParticipantId,
        _kind: &str,
        admin: bool,
        mut room: Room,
    ) -> Result<Room, String> {
        if room.members.contains(member) {
            return Err(format!("{member} is already in {}", room.name));
        }
        room.members.push(*member);
        room.invited.retain(|m| m != member);
        if admin {
            room.admins.push(*member);
        }
        self.index(&room);
        Ok(room)
    }

    async fn remove_member(&self, member: &ParticipantId, mut room: Room) -> Result<Room, String> {
        if !room.members.contains(member) {
            return Err(format!("{member} is not in {}", room.name));
        }
        room.members.retain(|m| m != member);
        room.admins.retain(|m| m != member);
        self.index(&room);
        Ok(room)
    }

    async fn is_member(&self, member: &ParticipantId, room: &Room) -> bool {
        room.members.contains(member)
    }

    async fn is_admin(&self, member: &ParticipantId, room: &Room) -> bool {
        room.admins.contains(member)
    }

    async fn invite_member(&self, member: &ParticipantId, mut room: Room) -> Result<Room, String> {
        if room.members.contains(member) || room.invited.contains(member) {
            return Err(format!("{member} needs no invite to {}", room.name));
        }
        room.invited.push(*member);
        Ok(room)
    }

    async fn send_message(
        &self,
        member: &ParticipantId,
        text: String,
        mut room: Room,
    ) -> Result<Room, String> {
        if !room.members.contains(member) {
            return Err(format!("{member} can't post in {}", room.name));
        }
        room.log.push(Line {
            from: *member,
            text,
        });
        Ok(room)
    }

    async fn messages(&self, room: &Room) -> Vec<Line> {
        room.log.clone()
    }

    async fn search_room(&self, params: &SearchParams) -> Vec<String> {
        let Ok(directory) = self.directory.lock() else {
            return Vec::new();
        };
        let needle = params.get("name").unwrap_or_default();
        let mut hits: Vec<String> = directory
            .keys()
            .filter(|name| name.contains(needle))
            .cloned()
            .collect();
        hits.sort();
        hits
    }

    async fn close(&self, room: &Room) -> Result<(), String> {
        let mut directory = self
            .directory
            .lock()
            .map_err(|_| "directory lock poisoned".to_string())?;
        directory.remove(&room.name);
        Ok(())
    }

    async fn persist(&self, room: &Room) -> Result<(), String> {
        let json = serde_json::to_string(room).map_err(|e| e.to_string())?;
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| "store lock poisoned".to_string())?;
        saved.insert(room.name.clone(), json);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

const ALICE: ParticipantId = ParticipantId(1);
const BOB: ParticipantId = ParticipantId(2);
const CAROL: ParticipantId = ParticipantId(3);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let kit = RoomkitBuilder::new().build(MemoryChat::default());

    let general = kit.open_room(ALICE, "general").await?;
    let random = kit.open_room(BOB, "random").await?;
    kit.join(BOB, &general, "general", "member").await?;
    kit.invite(CAROL, &general, "general").await?;
    kit.enter(BOB, "general").await?;

    general.send_message(ALICE, "hello".into()).await?;
    general.send_message(BOB, "hi alice".into()).await?;
    if let Err(e) = general.send_message(CAROL, "let me in".into()).await {
        tracing::info!(error = %e, "carol has only been invited");
    }

    for line in general.messages().await? {
        tracing::info!(from = %line.from, text = %line.text, "general");
    }
    let bobs_rooms = general.list(BOB).await?;
    tracing::info!(rooms = ?bobs_rooms, "bob's rooms according to the backend");
    let hits = random
        .search_room(SearchParams::new().with("name", "ra"))
        .await?;
    tracing::info!(?hits, "search for \"ra\"");

    general.persist().await?;

    let snapshot = std::env::temp_dir().join("memory-chat-registry.json");
    kit.persist(&snapshot).await?;

    kit.close_room(ALICE, "general").await?;
    general.terminated().await;
    for participant in [ALICE, BOB, CAROL] {
        let names: Vec<String> = kit
            .rooms_of(participant)
            .await?
            .into_iter()
            .map(|m| m.room_name)
            .collect();
        tracing::info!(%participant, ?names, "rooms after closing general");
    }

    // Entries for the closed room are dropped on load.
    let restored = kit.load(&snapshot).await?;
    tracing::info!(restored, path = %snapshot.display(), "registry reloaded");

    kit.shutdown().await?;
    Ok(())
}
