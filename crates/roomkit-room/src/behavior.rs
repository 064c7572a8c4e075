//! The `RoomBehavior` trait: the extension point for room business logic.
//!
//! The framework owns the actor loop, timeouts and the close handshake.
//! A backend (a relational store, an in-memory table, a test double)
//! implements this trait and never has to think about concurrency: the
//! framework hands it the room's current state and keeps whatever state
//! it hands back.

use std::fmt::Debug;
use std::future::Future;

use roomkit_protocol::{ParticipantId, SearchParams};

/// The capability set every room backend implements.
///
/// Associated types define the shape of a backend's data:
/// - `State`: everything the backend needs to serve one room. Opaque to
///   the framework, which only clones it and passes it through.
/// - `Member`: how the backend names a room member.
/// - `Message`: what a member can post.
/// - `History`: what [`messages`](Self::messages) returns.
/// - `Record`: one search hit from [`search_room`](Self::search_room).
///
/// State-changing capabilities take the current state by value and return
/// the next one; `Err(reason)` leaves the room exactly as it was. Every
/// method returns a `Send` future so handles can be driven from any task.
///
/// # Example
///
/// ```rust
/// use roomkit_protocol::{ParticipantId, SearchParams};
/// use roomkit_room::RoomBehavior;
///
/// #[derive(Default)]
/// struct Lobby;
///
/// #[derive(Clone, Default)]
/// struct LobbyState {
///     admin: Option<u64>,
///     members: Vec<u64>,
///     log: Vec<String>,
/// }
///
/// impl RoomBehavior for Lobby {
///     type State = LobbyState;
///     type Member = u64;
///     type Message = String;
///     type History = Vec<String>;
///     type Record = String;
///
///     async fn create(&self, admin: &u64, _name: Option<&str>, mut state: LobbyState) -> Result<LobbyState, String> {
///         state.admin = Some(*admin);
///         state.members.push(*admin);
///         Ok(state)
///     }
///     async fn list(&self, _participant: ParticipantId) -> Vec<String> { Vec::new() }
///     async fn list_members(&self, state: &LobbyState) -> Vec<u64> { state.members.clone() }
///     async fn add_member(&self, member: &u64, _kind: &str, _admin: bool, mut state: LobbyState) -> Result<LobbyState, String> {
///         state.members.push(*member);
///         Ok(state)
///     }
///     async fn remove_member(&self, member: &u64, mut state: LobbyState) -> Result<LobbyState, String> {
///         state.members.retain(|m| m != member);
///         Ok(state)
///     }
///     async fn is_member(&self, member: &u64, state: &LobbyState) -> bool { state.members.contains(member) }
///     async fn is_admin(&self, member: &u64, state: &LobbyState) -> bool { state.admin == Some(*member) }
///     async fn invite_member(&self, _member: &u64, state: LobbyState) -> Result<LobbyState, String> { Ok(state) }
///     async fn send_message(&self, _member: &u64, message: String, mut state: LobbyState) -> Result<LobbyState, String> {
///         state.log.push(message);
///         Ok(state)
///     }
///     async fn messages(&self, state: &LobbyState) -> Vec<String> { state.log.clone() }
///     async fn search_room(&self, _params: &SearchParams) -> Vec<String> { Vec::new() }
///     async fn close(&self, _state: &LobbyState) -> Result<(), String> { Ok(()) }
///     async fn persist(&self, _state: &LobbyState) -> Result<(), String> { Ok(()) }
/// }
/// ```
pub trait RoomBehavior: Send + Sync + 'static {
    /// Per-room state. `Default` is the value a freshly spawned room
    /// starts with before `create` runs.
    type State: Send + Sync + Clone + Default + 'static;

    /// A room member as the backend identifies it.
    type Member: Send + Sync + Clone + Debug + 'static;

    /// A chat message posted by a member.
    type Message: Send + 'static;

    /// The backend's view of a room's message history.
    type History: Send + 'static;

    /// A single result of a room search.
    type Record: Send + 'static;

    /// Initialises a room owned by `admin`. `name` is `None` when the
    /// backend should choose one.
    fn create(
        &self,
        admin: &Self::Member,
        name: Option<&str>,
        state: Self::State,
    ) -> impl Future<Output = Result<Self::State, String>> + Send;

    /// Returns the names of every room `participant` belongs to, as the
    /// backend records it. Independent of any single room's state.
    fn list(
        &self,
        participant: ParticipantId,
    ) -> impl Future<Output = Vec<String>> + Send;

    /// Returns the room's members.
    fn list_members(
        &self,
        state: &Self::State,
    ) -> impl Future<Output = Vec<Self::Member>> + Send;

    /// Adds `member` with a backend-defined membership `kind`; `admin`
    /// grants admin rights.
    fn add_member(
        &self,
        member: &Self::Member,
        kind: &str,
        admin: bool,
        state: Self::State,
    ) -> impl Future<Output = Result<Self::State, String>> + Send;

    /// Removes `member` from the room.
    fn remove_member(
        &self,
        member: &Self::Member,
        state: Self::State,
    ) -> impl Future<Output = Result<Self::State, String>> + Send;

    fn is_member(
        &self,
        member: &Self::Member,
        state: &Self::State,
    ) -> impl Future<Output = bool> + Send;

    /// Decides who may close the room.
    fn is_admin(
        &self,
        member: &Self::Member,
        state: &Self::State,
    ) -> impl Future<Output = bool> + Send;

    /// Records an invitation for `member`.
    fn invite_member(
        &self,
        member: &Self::Member,
        state: Self::State,
    ) -> impl Future<Output = Result<Self::State, String>> + Send;

    /// Posts `message` on behalf of `member`.
    fn send_message(
        &self,
        member: &Self::Member,
        message: Self::Message,
        state: Self::State,
    ) -> impl Future<Output = Result<Self::State, String>> + Send;

    fn messages(
        &self,
        state: &Self::State,
    ) -> impl Future<Output = Self::History> + Send;

    /// Searches rooms by keyword. Independent of any single room's state.
    fn search_room(
        &self,
        params: &SearchParams,
    ) -> impl Future<Output = Vec<Self::Record>> + Send;

    /// Releases the room's backend resources. Runs during the close
    /// handshake, right before the actor is told to stop.
    fn close(
        &self,
        state: &Self::State,
    ) -> impl Future<Output = Result<(), String>> + Send;

    /// Writes the room's state to durable storage.
    fn persist(
        &self,
        state: &Self::State,
    ) -> impl Future<Output = Result<(), String>> + Send;
}
