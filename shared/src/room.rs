//! Host-authoritative room model.
//!
//! A [`Room`] lives on exactly one host; every other participant holds a
//! read replica refreshed wholesale from `room_update` / `join_accepted`
//! payloads. All mutating methods here are meant to be called from the
//! host's message handlers only.
//!
//! Two identity keys per seat: `od_id` is the durable per-device identity
//! that survives reconnects, `peer_id` is the ephemeral routing key that
//! changes every session. Rejoin matches on `od_id` and swaps in the fresh
//! `peer_id`.

use serde::{Deserialize, Serialize};

use crate::game::Difficulty;
use crate::SessionId;

/// Lobby/game lifecycle. Only the host may advance it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Starting,
    Playing,
    Finished,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfig {
    pub max_players: usize,
    pub min_players: usize,
    pub is_private: bool,
    pub game_slug: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPlayer {
    /// Durable per-device identity; the dedup/rejoin key.
    pub od_id: String,
    /// Ephemeral session identity; replaced on every reconnect.
    pub peer_id: SessionId,
    pub nickname: String,
    pub avatar: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub is_connected: bool,
    pub is_ai: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub joined_at: u64,
}

/// Outcome of a join attempt against the host's canonical room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new seat was appended.
    Seated,
    /// An existing seat was reclaimed by `od_id`; its peer id was refreshed.
    Rejoined,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    /// 6-character human-shareable token, used only for out-of-band discovery.
    pub code: String,
    /// Durable identity of the host.
    pub host_id: String,
    /// Ephemeral session identity of the host. Immutable for the room's
    /// lifetime: there is no host migration.
    pub host_peer_id: SessionId,
    pub game_slug: String,
    pub status: RoomStatus,
    /// Insertion order is join order; seat index for game modules.
    pub players: Vec<RoomPlayer>,
    pub config: RoomConfig,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Room {
    pub fn new(
        id: String,
        code: String,
        host_od_id: String,
        host_peer_id: SessionId,
        nickname: String,
        avatar: String,
        config: RoomConfig,
        now: u64,
    ) -> Self {
        let host = RoomPlayer {
            od_id: host_od_id.clone(),
            peer_id: host_peer_id.clone(),
            nickname,
            avatar,
            is_host: true,
            is_ready: true,
            is_connected: true,
            is_ai: false,
            difficulty: None,
            joined_at: now,
        };
        Room {
            id,
            code,
            host_id: host_od_id,
            host_peer_id,
            game_slug: config.game_slug.clone(),
            status: RoomStatus::Waiting,
            players: vec![host],
            config,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn player(&self, od_id: &str) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.od_id == od_id)
    }

    pub fn player_mut(&mut self, od_id: &str) -> Option<&mut RoomPlayer> {
        self.players.iter_mut().find(|p| p.od_id == od_id)
    }

    pub fn player_by_peer(&self, peer_id: &str) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.peer_id == peer_id)
    }

    /// Seat index used by game modules: position in join order.
    pub fn seat_of_peer(&self, peer_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.peer_id == peer_id)
    }

    /// Validate and apply a join request. `invited` gates private rooms.
    ///
    /// Rejoin: an `od_id` that already holds a seat reclaims it regardless of
    /// room status or capacity; its stale peer id is replaced and the seat is
    /// marked connected. New joins require a waiting, non-full room.
    pub fn try_join(
        &mut self,
        od_id: &str,
        peer_id: &str,
        nickname: &str,
        avatar: &str,
        invited: bool,
        now: u64,
    ) -> Result<JoinOutcome, String> {
        if let Some(seat) = self.player_mut(od_id) {
            seat.peer_id = peer_id.to_string();
            seat.is_connected = true;
            self.touch(now);
            return Ok(JoinOutcome::Rejoined);
        }

        if self.config.is_private && !invited {
            return Err("room is private".into());
        }
        if self.status != RoomStatus::Waiting {
            return Err("game already in progress".into());
        }
        if self.players.len() >= self.config.max_players {
            return Err("room is full".into());
        }

        self.players.push(RoomPlayer {
            od_id: od_id.to_string(),
            peer_id: peer_id.to_string(),
            nickname: nickname.to_string(),
            avatar: avatar.to_string(),
            is_host: false,
            is_ready: false,
            is_connected: true,
            is_ai: false,
            difficulty: None,
            joined_at: now,
        });
        self.touch(now);
        Ok(JoinOutcome::Seated)
    }

    /// Seat a computer-controlled player. The id is deterministic per
    /// difficulty so repeated games reuse the same synthetic identity.
    pub fn add_ai_seat(&mut self, difficulty: Difficulty, now: u64) -> Result<(), String> {
        if self.status != RoomStatus::Waiting {
            return Err("game already in progress".into());
        }
        if self.players.len() >= self.config.max_players {
            return Err("room is full".into());
        }
        let od_id = difficulty.ai_id();
        if self.player(od_id).is_some() {
            return Err("AI seat for this difficulty already exists".into());
        }
        self.players.push(RoomPlayer {
            od_id: od_id.to_string(),
            peer_id: od_id.to_string(),
            nickname: difficulty.ai_nickname().to_string(),
            avatar: "robot".to_string(),
            is_host: false,
            is_ready: true,
            is_connected: true,
            is_ai: true,
            difficulty: Some(difficulty),
            joined_at: now,
        });
        self.touch(now);
        Ok(())
    }

    /// Flip a seat's readiness. Returns false for unknown seats.
    pub fn set_ready(&mut self, od_id: &str, ready: bool, now: u64) -> bool {
        match self.player_mut(od_id) {
            Some(p) => {
                p.is_ready = ready;
                self.touch(now);
                true
            }
            None => false,
        }
    }

    /// Channel closed for `peer_id`: keep the seat, mark it disconnected so
    /// the same `od_id` can reclaim it later.
    pub fn mark_disconnected(&mut self, peer_id: &str, now: u64) -> Option<String> {
        let seat = self.players.iter_mut().find(|p| p.peer_id == peer_id)?;
        seat.is_connected = false;
        let od_id = seat.od_id.clone();
        self.touch(now);
        Some(od_id)
    }

    /// Explicit leave or kick: the seat is gone for good.
    pub fn remove_player(&mut self, od_id: &str, now: u64) -> Option<RoomPlayer> {
        let idx = self.players.iter().position(|p| p.od_id == od_id)?;
        let removed = self.players.remove(idx);
        self.touch(now);
        Some(removed)
    }

    /// True when the host may start: enough seats, and every human guest is
    /// ready and connected. AI seats are always ready.
    pub fn can_start(&self) -> bool {
        self.status == RoomStatus::Waiting
            && self.players.len() >= self.config.min_players
            && self
                .players
                .iter()
                .all(|p| p.is_ai || p.is_host || (p.is_ready && p.is_connected))
    }

    /// The structural invariants every mutation must preserve.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.players.len() > self.config.max_players {
            return Err(format!(
                "{} players exceeds max {}",
                self.players.len(),
                self.config.max_players
            ));
        }
        let hosts: Vec<_> = self.players.iter().filter(|p| p.is_host).collect();
        if hosts.len() != 1 {
            return Err(format!("expected exactly one host, found {}", hosts.len()));
        }
        if hosts[0].peer_id != self.host_peer_id {
            return Err("host seat does not match hostPeerId".into());
        }
        Ok(())
    }

    fn touch(&mut self, now: u64) {
        self.updated_at = now;
    }
}
