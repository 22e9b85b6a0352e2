//! Rock-paper-scissors, first to a target score. Both seats pick
//! simultaneously, so [`GameModule::turn`] is always `None` and the host
//! resolves a round once both picks are in.

use serde::{Deserialize, Serialize};

use crate::game::{GameModule, Outcome};

pub const SLUG: &str = "rps";
pub const DEFAULT_TARGET: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

pub const HANDS: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];

impl Hand {
    /// The hand this one defeats.
    pub fn beats(self) -> Hand {
        match self {
            Hand::Rock => Hand::Scissors,
            Hand::Paper => Hand::Rock,
            Hand::Scissors => Hand::Paper,
        }
    }

    /// The hand that defeats this one.
    pub fn counter(self) -> Hand {
        match self {
            Hand::Rock => Hand::Paper,
            Hand::Paper => Hand::Scissors,
            Hand::Scissors => Hand::Rock,
        }
    }
}

/// Seat index of the round winner, or `None` for a tie.
pub fn round_winner(a: Hand, b: Hand) -> Option<usize> {
    if a == b {
        None
    } else if a.beats() == b {
        Some(0)
    } else {
        Some(1)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpsState {
    /// Pending picks for the current round, one slot per seat.
    pub picks: Vec<Option<Hand>>,
    /// Resolved rounds as (seat 0 hand, seat 1 hand).
    pub history: Vec<(Hand, Hand)>,
    pub scores: Vec<u32>,
    pub target: u32,
}

pub struct RockPaperScissors;

impl GameModule for RockPaperScissors {
    type State = RpsState;
    type Move = Hand;

    fn slug(&self) -> &'static str {
        SLUG
    }

    fn initial_state(&self, _seed: u64) -> RpsState {
        RpsState {
            picks: vec![None, None],
            history: Vec::new(),
            scores: vec![0, 0],
            target: DEFAULT_TARGET,
        }
    }

    /// Simultaneous-move game: there is never a single seat "to move".
    fn turn(&self, _state: &RpsState) -> Option<usize> {
        None
    }

    fn legal_moves(&self, state: &RpsState) -> Vec<Hand> {
        if self.is_terminal(state).is_some() {
            Vec::new()
        } else {
            HANDS.to_vec()
        }
    }

    fn apply_move(&self, state: &RpsState, seat: usize, mv: &Hand) -> Option<RpsState> {
        if seat >= 2 || self.is_terminal(state).is_some() || state.picks[seat].is_some() {
            return None;
        }
        let mut next = state.clone();
        next.picks[seat] = Some(*mv);
        if let (Some(a), Some(b)) = (next.picks[0], next.picks[1]) {
            if let Some(winner) = round_winner(a, b) {
                next.scores[winner] += 1;
            }
            next.history.push((a, b));
            next.picks = vec![None, None];
        }
        Some(next)
    }

    fn is_terminal(&self, state: &RpsState) -> Option<Outcome> {
        state
            .scores
            .iter()
            .position(|&s| s >= state.target)
            .map(|seat| Outcome::Win { seat })
    }
}
