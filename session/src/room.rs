//! Host-authoritative room coordination.
//!
//! [`HostRoom`] owns the canonical [`Room`] and the authoritative game
//! state; it answers join requests, relays chat, validates every
//! `game_action` before applying it, and drives any computer-controlled
//! seats. [`GuestRoom`] holds a read replica that is replaced wholesale
//! from `room_update` / `join_accepted` / `sync_response` payloads and
//! surfaces everything as [`RoomEvent`]s.
//!
//! All room mutation happens inside the host's message handlers, which the
//! dispatcher runs to completion one at a time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tokio::sync::mpsc;

use shared::codes::{generate_id, generate_room_code, timestamp_millis};
use shared::envelope::{Envelope, Message, MessageType};
use shared::game::{Difficulty, ErasedGame, Outcome};
use shared::games::by_slug;
use shared::room::{JoinOutcome, Room, RoomConfig, RoomPlayer, RoomStatus};
use shared::SessionId;

use crate::connection::{ConnectionManager, SessionError};
use crate::dispatch::HandlerId;

/// The local player's durable identity and presentation.
#[derive(Clone, Debug)]
pub struct PlayerProfile {
    pub od_id: String,
    pub nickname: String,
    pub avatar: String,
}

/// Everything the presentation layer needs to observe about a room.
#[derive(Clone, Debug)]
pub enum RoomEvent {
    /// Our join request was accepted; carries the first room snapshot.
    Joined { room: Room },
    Rejected { reason: String },
    RoomUpdated { room: Room },
    PlayerJoined { player: RoomPlayer },
    PlayerLeft { od_id: String },
    GameStarted { room: Room, state: Value },
    StateChanged { state: Value },
    GameFinished { outcome: Outcome },
    Chat { nickname: String, text: String },
    Kicked { reason: String },
}

struct HostState {
    room: Room,
    game: Option<Box<dyn ErasedGame>>,
    game_state: Option<Value>,
    rng: StdRng,
    invited: HashSet<String>,
}

struct HostShared {
    manager: Arc<ConnectionManager>,
    state: Mutex<HostState>,
    events: mpsc::UnboundedSender<RoomEvent>,
}

/// The host side of a room. Dropping it unsubscribes all handlers.
pub struct HostRoom {
    manager: Arc<ConnectionManager>,
    shared: Arc<HostShared>,
    handler_ids: Vec<HandlerId>,
}

impl HostRoom {
    /// Create a room with the local player as host. The manager must be
    /// initialized; its disconnection hook is replaced so seat state can
    /// track channel closes, the other lifecycle callbacks are kept.
    pub fn create(
        manager: Arc<ConnectionManager>,
        profile: PlayerProfile,
        config: RoomConfig,
    ) -> Result<(HostRoom, mpsc::UnboundedReceiver<RoomEvent>), SessionError> {
        let host_peer_id = manager.session_id().ok_or(SessionError::NotInitialized)?;
        let mut rng = StdRng::from_entropy();
        let now = timestamp_millis();
        let room = Room::new(
            generate_id(&mut rng),
            generate_room_code(&mut rng),
            profile.od_id,
            host_peer_id,
            profile.nickname,
            profile.avatar,
            config,
            now,
        );
        info!("hosting room {} with code {}", room.id, room.code);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(HostShared {
            manager: Arc::clone(&manager),
            state: Mutex::new(HostState {
                room,
                game: None,
                game_state: None,
                rng,
                invited: HashSet::new(),
            }),
            events: events_tx,
        });

        let subscribe = |message_type, f: fn(&HostShared, &Envelope)| {
            let shared = Arc::clone(&shared);
            manager.on_message(message_type, move |env| f(&shared, env))
        };
        let handler_ids = vec![
            subscribe(MessageType::JoinRequest, HostShared::handle_join_request),
            subscribe(MessageType::PlayerLeft, HostShared::handle_player_left),
            subscribe(MessageType::PlayerReady, |s, e| s.handle_ready(e, true)),
            subscribe(MessageType::PlayerUnready, |s, e| s.handle_ready(e, false)),
            subscribe(MessageType::GameAction, HostShared::handle_game_action),
            subscribe(MessageType::Chat, HostShared::handle_chat),
            subscribe(MessageType::Ping, HostShared::handle_ping),
            subscribe(MessageType::SyncRequest, HostShared::handle_sync_request),
        ];

        manager.set_on_disconnection(Some({
            let shared = Arc::clone(&shared);
            Arc::new(move |peer| shared.handle_peer_disconnect(peer))
        }));

        Ok((
            HostRoom {
                manager,
                shared,
                handler_ids,
            },
            events_rx,
        ))
    }

    pub fn room(&self) -> Room {
        self.shared.locked().room.clone()
    }

    pub fn code(&self) -> String {
        self.shared.locked().room.code.clone()
    }

    pub fn game_state(&self) -> Option<Value> {
        self.shared.locked().game_state.clone()
    }

    /// Allow an `od_id` through the private-room gate.
    pub fn invite(&self, od_id: &str) {
        self.shared.locked().invited.insert(od_id.to_string());
    }

    /// Seat a computer-controlled player.
    pub fn add_ai_seat(&self, difficulty: Difficulty) -> Result<(), String> {
        let room = {
            let mut st = self.shared.locked();
            st.room.add_ai_seat(difficulty, timestamp_millis())?;
            st.room.clone()
        };
        self.shared.broadcast_room(&room);
        Ok(())
    }

    /// Remove a guest and tell it why. Returns false for the host's own
    /// seat or an unknown `od_id`.
    pub fn kick(&self, od_id: &str, reason: &str) -> bool {
        let removed = {
            let mut st = self.shared.locked();
            if st.room.host_id == od_id {
                return false;
            }
            st.room
                .remove_player(od_id, timestamp_millis())
                .map(|player| (player, st.room.clone()))
        };
        let Some((player, room)) = removed else {
            return false;
        };
        self.shared.manager.send(
            &player.peer_id,
            Message::Kick {
                od_id: od_id.to_string(),
                reason: reason.to_string(),
            },
        );
        self.shared.manager.disconnect_peer(&player.peer_id);
        self.shared
            .manager
            .broadcast(Message::RoomUpdate { room: room.clone() }, Some(&player.peer_id));
        self.shared.emit(RoomEvent::PlayerLeft {
            od_id: od_id.to_string(),
        });
        self.shared.emit(RoomEvent::RoomUpdated { room });
        true
    }

    /// Transition waiting to starting to playing and broadcast the initial
    /// authoritative state. Fails unless every human guest is ready and the
    /// room has enough seats.
    pub fn start_game(&self) -> Result<(), String> {
        let (room, state) = {
            let mut st = self.shared.locked();
            if !st.room.can_start() {
                return Err("players are not ready".into());
            }
            let game = by_slug(&st.room.game_slug)
                .ok_or_else(|| format!("unknown game '{}'", st.room.game_slug))?;
            st.room.status = RoomStatus::Starting;
            let seed = st.rng.gen();
            let state = game.initial_state(seed);
            st.game = Some(game);
            st.game_state = Some(state.clone());
            st.room.status = RoomStatus::Playing;
            st.room.updated_at = timestamp_millis();
            (st.room.clone(), state)
        };
        info!("starting {} in room {}", room.game_slug, room.id);
        self.shared.manager.broadcast(
            Message::GameStart {
                room: room.clone(),
                state: state.clone(),
            },
            None,
        );
        self.shared.emit(RoomEvent::GameStarted { room, state });
        self.shared.drive_ai();
        Ok(())
    }

    /// Submit the host's own move through the same validation path guests
    /// go through.
    pub fn submit_action(&self, action: Value) {
        let seat = {
            let st = self.shared.locked();
            st.room.seat_of_peer(&st.room.host_peer_id)
        };
        match seat {
            Some(seat) => self.shared.apply_action(seat, &action),
            None => warn!("host has no seat in its own room"),
        }
    }

    /// Back to the lobby: clears game state and guest readiness.
    pub fn reset(&self) {
        let room = {
            let mut st = self.shared.locked();
            st.room.status = RoomStatus::Waiting;
            st.game = None;
            st.game_state = None;
            for player in st.room.players.iter_mut() {
                if !player.is_host && !player.is_ai {
                    player.is_ready = false;
                }
            }
            st.room.updated_at = timestamp_millis();
            st.room.clone()
        };
        self.shared.broadcast_room(&room);
    }
}

impl Drop for HostRoom {
    fn drop(&mut self) {
        for id in self.handler_ids.drain(..) {
            self.manager.off(id);
        }
    }
}

impl HostShared {
    fn locked(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: RoomEvent) {
        let _ = self.events.send(event);
    }

    fn broadcast_room(&self, room: &Room) {
        self.manager
            .broadcast(Message::RoomUpdate { room: room.clone() }, None);
        self.emit(RoomEvent::RoomUpdated { room: room.clone() });
    }

    fn handle_join_request(&self, env: &Envelope) {
        let Message::JoinRequest {
            od_id,
            nickname,
            avatar,
        } = &env.body
        else {
            return;
        };
        let peer_id = env.sender_id.clone();
        let result = {
            let mut st = self.locked();
            let invited = st.invited.contains(od_id);
            st.room
                .try_join(od_id, &peer_id, nickname, avatar, invited, timestamp_millis())
                .map(|outcome| (outcome, st.room.clone(), st.game_state.clone()))
        };
        match result {
            Ok((outcome, room, game_state)) => {
                info!("{od_id} joined room {} as {peer_id}", room.id);
                self.manager
                    .send(&peer_id, Message::JoinAccepted { room: room.clone() });
                if outcome == JoinOutcome::Rejoined && game_state.is_some() {
                    self.manager.send(
                        &peer_id,
                        Message::SyncResponse {
                            room: room.clone(),
                            state: game_state,
                        },
                    );
                }
                if let Some(player) = room.player(od_id).cloned() {
                    self.manager.broadcast(
                        Message::PlayerJoined {
                            player: player.clone(),
                        },
                        Some(&peer_id),
                    );
                    self.emit(RoomEvent::PlayerJoined { player });
                }
                self.manager
                    .broadcast(Message::RoomUpdate { room: room.clone() }, Some(&peer_id));
                self.emit(RoomEvent::RoomUpdated { room });
            }
            Err(reason) => {
                debug!("rejecting join from {peer_id}: {reason}");
                self.manager.send(&peer_id, Message::JoinRejected { reason });
            }
        }
    }

    fn handle_player_left(&self, env: &Envelope) {
        let Message::PlayerLeft { od_id } = &env.body else {
            return;
        };
        let removed = {
            let mut st = self.locked();
            // Only the seat's current peer may give it up, and the host
            // seat is never removed this way.
            match st.room.player(od_id) {
                Some(player) if player.peer_id == env.sender_id && !player.is_host => {}
                _ => {
                    debug!("ignoring player_left for {od_id} from {}", env.sender_id);
                    return;
                }
            }
            st.room
                .remove_player(od_id, timestamp_millis())
                .map(|player| (player, st.room.clone()))
        };
        let Some((player, room)) = removed else {
            return;
        };
        self.manager.disconnect_peer(&player.peer_id);
        self.emit(RoomEvent::PlayerLeft {
            od_id: player.od_id,
        });
        self.broadcast_room(&room);
    }

    fn handle_ready(&self, env: &Envelope, ready: bool) {
        let od_id = match &env.body {
            Message::PlayerReady { od_id } | Message::PlayerUnready { od_id } => od_id.clone(),
            _ => return,
        };
        let room = {
            let mut st = self.locked();
            // Only the seat's current peer may flip its readiness.
            match st.room.player(&od_id) {
                Some(player) if player.peer_id == env.sender_id => {}
                _ => {
                    debug!("ignoring readiness for {od_id} from {}", env.sender_id);
                    return;
                }
            }
            st.room.set_ready(&od_id, ready, timestamp_millis());
            st.room.clone()
        };
        self.broadcast_room(&room);
    }

    fn handle_game_action(&self, env: &Envelope) {
        let Message::GameAction { action } = &env.body else {
            return;
        };
        let seat = self.locked().room.seat_of_peer(&env.sender_id);
        let Some(seat) = seat else {
            debug!("dropping action from non-member {}", env.sender_id);
            return;
        };
        self.apply_action(seat, action);
    }

    fn handle_chat(&self, env: &Envelope) {
        let Message::Chat { nickname, text } = &env.body else {
            return;
        };
        self.manager.broadcast(
            Message::Chat {
                nickname: nickname.clone(),
                text: text.clone(),
            },
            Some(&env.sender_id),
        );
        self.emit(RoomEvent::Chat {
            nickname: nickname.clone(),
            text: text.clone(),
        });
    }

    fn handle_ping(&self, env: &Envelope) {
        self.manager.send(&env.sender_id, Message::Pong {});
    }

    fn handle_sync_request(&self, env: &Envelope) {
        let (room, state) = {
            let st = self.locked();
            (st.room.clone(), st.game_state.clone())
        };
        self.manager
            .send(&env.sender_id, Message::SyncResponse { room, state });
    }

    fn handle_peer_disconnect(&self, peer_id: &str) {
        let room = {
            let mut st = self.locked();
            match st.room.mark_disconnected(peer_id, timestamp_millis()) {
                Some(_) => st.room.clone(),
                None => return,
            }
        };
        info!("peer {peer_id} disconnected, keeping its seat for rejoin");
        self.broadcast_room(&room);
    }

    /// Validate and apply one move for `seat`. Illegal, late and
    /// out-of-turn actions are dropped without reply; the host never
    /// applies a move it cannot validate.
    fn apply_action(&self, seat: usize, action: &Value) {
        let step = {
            let mut st = self.locked();
            if st.room.status != RoomStatus::Playing {
                debug!("dropping action outside an active game");
                return;
            }
            let verdict = {
                let Some(game) = st.game.as_deref() else {
                    return;
                };
                let Some(current) = st.game_state.as_ref() else {
                    return;
                };
                if let Some(turn_seat) = game.turn(current) {
                    if turn_seat != seat {
                        debug!("dropping out-of-turn action from seat {seat}");
                        return;
                    }
                }
                game.apply(current, seat, action)
                    .map(|next| (game.is_terminal(&next), next))
            };
            let Some((terminal, next)) = verdict else {
                debug!("dropping illegal action from seat {seat}");
                return;
            };
            st.game_state = Some(next.clone());
            if terminal.is_some() {
                st.room.status = RoomStatus::Finished;
                st.room.updated_at = timestamp_millis();
            }
            (next, terminal, st.room.clone())
        };
        let finished = step.1.is_some();
        self.publish_step(step);
        if !finished {
            self.drive_ai();
        }
    }

    /// Let computer-controlled seats move until none of them has a move.
    /// Engines return `None` off-turn (or once a simultaneous pick is in),
    /// so this terminates for every game.
    fn drive_ai(&self) {
        loop {
            let step = {
                let mut st = self.locked();
                if st.room.status != RoomStatus::Playing {
                    return;
                }
                let slug = st.room.game_slug.clone();
                let Some(current) = st.game_state.clone() else {
                    return;
                };
                let ai_seats: Vec<(usize, Difficulty)> = st
                    .room
                    .players
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.is_ai)
                    .filter_map(|(i, p)| p.difficulty.map(|d| (i, d)))
                    .collect();

                let mut chosen = None;
                for (seat, difficulty) in ai_seats {
                    if let Some(mv) =
                        ai::engine::select_for_slug(&slug, &current, seat, difficulty, &mut st.rng)
                    {
                        chosen = Some((seat, mv));
                        break;
                    }
                }
                let Some((seat, mv)) = chosen else {
                    return;
                };

                let applied = {
                    let Some(game) = st.game.as_deref() else {
                        return;
                    };
                    game.apply(&current, seat, &mv)
                        .map(|next| (game.is_terminal(&next), next))
                };
                let Some((terminal, next)) = applied else {
                    warn!("engine produced an illegal move for seat {seat}");
                    return;
                };
                st.game_state = Some(next.clone());
                if terminal.is_some() {
                    st.room.status = RoomStatus::Finished;
                    st.room.updated_at = timestamp_millis();
                }
                (next, terminal, st.room.clone())
            };
            let finished = step.1.is_some();
            self.publish_step(step);
            if finished {
                return;
            }
        }
    }

    fn publish_step(&self, (state, terminal, room): (Value, Option<Outcome>, Room)) {
        self.manager
            .broadcast(Message::GameState { state: state.clone() }, None);
        self.emit(RoomEvent::StateChanged { state });
        if let Some(outcome) = terminal {
            self.broadcast_room(&room);
            self.emit(RoomEvent::GameFinished { outcome });
        }
    }
}

struct GuestState {
    room: Option<Room>,
    game_state: Option<Value>,
}

struct GuestShared {
    state: Mutex<GuestState>,
    events: mpsc::UnboundedSender<RoomEvent>,
    od_id: String,
}

/// The guest side of a room: a read replica plus the outbound verbs.
pub struct GuestRoom {
    manager: Arc<ConnectionManager>,
    shared: Arc<GuestShared>,
    handler_ids: Vec<HandlerId>,
    host_peer_id: SessionId,
    profile: PlayerProfile,
}

impl GuestRoom {
    /// Connect to the host and request a seat. The seat grant (or the
    /// rejection) arrives as a [`RoomEvent`].
    pub async fn join(
        manager: Arc<ConnectionManager>,
        profile: PlayerProfile,
        host_peer_id: &str,
    ) -> Result<(GuestRoom, mpsc::UnboundedReceiver<RoomEvent>), SessionError> {
        manager.connect_to_peer(host_peer_id).await?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(GuestShared {
            state: Mutex::new(GuestState {
                room: None,
                game_state: None,
            }),
            events: events_tx,
            od_id: profile.od_id.clone(),
        });

        let guest_types = [
            MessageType::JoinAccepted,
            MessageType::JoinRejected,
            MessageType::RoomUpdate,
            MessageType::PlayerJoined,
            MessageType::GameStart,
            MessageType::GameState,
            MessageType::Chat,
            MessageType::Kick,
            MessageType::SyncResponse,
        ];
        let handler_ids = guest_types
            .into_iter()
            .map(|message_type| {
                let shared = Arc::clone(&shared);
                manager.on_message(message_type, move |env| shared.handle(env))
            })
            .collect();

        manager.send(
            host_peer_id,
            Message::JoinRequest {
                od_id: profile.od_id.clone(),
                nickname: profile.nickname.clone(),
                avatar: profile.avatar.clone(),
            },
        );

        Ok((
            GuestRoom {
                manager,
                shared,
                handler_ids,
                host_peer_id: host_peer_id.to_string(),
                profile,
            },
            events_rx,
        ))
    }

    /// The cached replica, if a snapshot has arrived yet.
    pub fn room(&self) -> Option<Room> {
        self.shared.locked().room.clone()
    }

    pub fn game_state(&self) -> Option<Value> {
        self.shared.locked().game_state.clone()
    }

    pub fn set_ready(&self, ready: bool) -> bool {
        let od_id = self.profile.od_id.clone();
        let body = if ready {
            Message::PlayerReady { od_id }
        } else {
            Message::PlayerUnready { od_id }
        };
        self.manager.send(&self.host_peer_id, body)
    }

    /// Send a move intent. The authoritative result comes back as a
    /// `game_state` broadcast; the local replica is never trusted.
    pub fn submit_action(&self, action: Value) -> bool {
        self.manager
            .send(&self.host_peer_id, Message::GameAction { action })
    }

    pub fn chat(&self, text: &str) -> bool {
        self.manager.send(
            &self.host_peer_id,
            Message::Chat {
                nickname: self.profile.nickname.clone(),
                text: text.to_string(),
            },
        )
    }

    /// Ask the host for a full room and game-state snapshot.
    pub fn request_sync(&self) -> bool {
        self.manager.send(&self.host_peer_id, Message::SyncRequest {})
    }

    pub fn leave(&self) {
        self.manager.send(
            &self.host_peer_id,
            Message::PlayerLeft {
                od_id: self.profile.od_id.clone(),
            },
        );
        self.manager.disconnect_peer(&self.host_peer_id);
    }
}

impl Drop for GuestRoom {
    fn drop(&mut self) {
        for id in self.handler_ids.drain(..) {
            self.manager.off(id);
        }
    }
}

impl GuestShared {
    fn locked(&self) -> MutexGuard<'_, GuestState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: RoomEvent) {
        let _ = self.events.send(event);
    }

    fn handle(&self, env: &Envelope) {
        match &env.body {
            Message::JoinAccepted { room } => {
                self.locked().room = Some(room.clone());
                self.emit(RoomEvent::Joined { room: room.clone() });
            }
            Message::JoinRejected { reason } => {
                self.emit(RoomEvent::Rejected {
                    reason: reason.clone(),
                });
            }
            Message::RoomUpdate { room } => {
                self.locked().room = Some(room.clone());
                self.emit(RoomEvent::RoomUpdated { room: room.clone() });
            }
            Message::PlayerJoined { player } => {
                self.emit(RoomEvent::PlayerJoined {
                    player: player.clone(),
                });
            }
            Message::GameStart { room, state } => {
                {
                    let mut st = self.locked();
                    st.room = Some(room.clone());
                    st.game_state = Some(state.clone());
                }
                self.emit(RoomEvent::GameStarted {
                    room: room.clone(),
                    state: state.clone(),
                });
            }
            Message::GameState { state } => {
                let slug = {
                    let mut st = self.locked();
                    st.game_state = Some(state.clone());
                    st.room.as_ref().map(|r| r.game_slug.clone())
                };
                self.emit(RoomEvent::StateChanged {
                    state: state.clone(),
                });
                // The replica detects terminal states itself instead of
                // waiting for the trailing room_update.
                if let Some(outcome) = slug
                    .and_then(|slug| by_slug(&slug))
                    .and_then(|game| game.is_terminal(state))
                {
                    self.emit(RoomEvent::GameFinished { outcome });
                }
            }
            Message::Chat { nickname, text } => {
                self.emit(RoomEvent::Chat {
                    nickname: nickname.clone(),
                    text: text.clone(),
                });
            }
            Message::Kick { od_id, reason } => {
                if *od_id == self.od_id {
                    self.emit(RoomEvent::Kicked {
                        reason: reason.clone(),
                    });
                }
            }
            Message::SyncResponse { room, state } => {
                {
                    let mut st = self.locked();
                    st.room = Some(room.clone());
                    st.game_state = state.clone();
                }
                self.emit(RoomEvent::RoomUpdated { room: room.clone() });
                if let Some(state) = state {
                    self.emit(RoomEvent::StateChanged {
                        state: state.clone(),
                    });
                }
            }
            _ => {}
        }
    }
}
