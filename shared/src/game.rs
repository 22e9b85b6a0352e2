//! The game-module contract the networking core and search engines consume.
//!
//! A game module is rules only: serializable state, legal moves, a
//! validating apply, and a terminal check. Rendering and input live
//! elsewhere. [`GameModule`] is the typed trait; [`ErasedGame`] is its
//! object-safe form over `serde_json::Value`, which is what the room
//! coordinator holds so it can stay game-agnostic.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Difficulty tier for computer-controlled opponents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Deterministic synthetic identity: repeated games reuse the same AI seat.
    pub fn ai_id(self) -> &'static str {
        match self {
            Difficulty::Easy => "ai-easy",
            Difficulty::Medium => "ai-medium",
            Difficulty::Hard => "ai-hard",
        }
    }

    pub fn ai_nickname(self) -> &'static str {
        match self {
            Difficulty::Easy => "Bot (easy)",
            Difficulty::Medium => "Bot (medium)",
            Difficulty::Hard => "Bot (hard)",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// Terminal result of a game. Seats are indices into the room's join order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Win { seat: usize },
    Draw,
}

/// Pure rules for one game.
pub trait GameModule {
    type State: Serialize + DeserializeOwned + Clone + PartialEq;
    type Move: Serialize + DeserializeOwned + Clone;

    fn slug(&self) -> &'static str;

    /// Initial state. `seed` feeds any dealing/shuffling so chance games
    /// replay deterministically; deterministic games ignore it.
    fn initial_state(&self, seed: u64) -> Self::State;

    /// Seat to move, or `None` for simultaneous-move and terminal states.
    fn turn(&self, state: &Self::State) -> Option<usize>;

    fn legal_moves(&self, state: &Self::State) -> Vec<Self::Move>;

    /// Validating apply: `None` for any illegal move (wrong seat, occupied
    /// cell, terminal state), never a panic.
    fn apply_move(&self, state: &Self::State, seat: usize, mv: &Self::Move)
        -> Option<Self::State>;

    fn is_terminal(&self, state: &Self::State) -> Option<Outcome>;
}

/// Object-safe game module over serialized values.
pub trait ErasedGame: Send + Sync {
    fn slug(&self) -> &'static str;
    fn initial_state(&self, seed: u64) -> Value;
    fn turn(&self, state: &Value) -> Option<usize>;
    fn apply(&self, state: &Value, seat: usize, mv: &Value) -> Option<Value>;
    fn is_terminal(&self, state: &Value) -> Option<Outcome>;
}

/// Adapter from a typed [`GameModule`] to [`ErasedGame`]. Any value that
/// fails to deserialize into the module's types is treated as illegal input.
pub struct Erased<G>(pub G);

impl<G> ErasedGame for Erased<G>
where
    G: GameModule + Send + Sync,
{
    fn slug(&self) -> &'static str {
        self.0.slug()
    }

    fn initial_state(&self, seed: u64) -> Value {
        serde_json::to_value(self.0.initial_state(seed)).unwrap_or(Value::Null)
    }

    fn turn(&self, state: &Value) -> Option<usize> {
        let state: G::State = serde_json::from_value(state.clone()).ok()?;
        self.0.turn(&state)
    }

    fn apply(&self, state: &Value, seat: usize, mv: &Value) -> Option<Value> {
        let state: G::State = serde_json::from_value(state.clone()).ok()?;
        let mv: G::Move = serde_json::from_value(mv.clone()).ok()?;
        let next = self.0.apply_move(&state, seat, &mv)?;
        serde_json::to_value(next).ok()
    }

    fn is_terminal(&self, state: &Value) -> Option<Outcome> {
        let state: G::State = serde_json::from_value(state.clone()).ok()?;
        self.0.is_terminal(&state)
    }
}
