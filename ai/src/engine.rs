//! Slug-keyed dispatch over serialized game state.
//!
//! The room coordinator holds state as `serde_json::Value` and only knows
//! the room's game slug, so this is its single entry point into the
//! engines. Returns `None` for unknown slugs, undeserializable state, or
//! positions where the seat has no move to make.

use log::debug;
use rand::Rng;
use serde_json::Value;

use shared::game::Difficulty;
use shared::games::connect_four::ConnectFourState;
use shared::games::gomoku::GomokuState;
use shared::games::rps::RpsState;
use shared::games::tictactoe::TicTacToeState;
use shared::games::{connect_four, gomoku, rps, tictactoe};

/// Select a serialized move for `seat` in the game identified by `slug`.
pub fn select_for_slug(
    slug: &str,
    state: &Value,
    seat: usize,
    difficulty: Difficulty,
    rng: &mut impl Rng,
) -> Option<Value> {
    match slug {
        tictactoe::SLUG => {
            let state: TicTacToeState = deserialize(slug, state)?;
            let cell = crate::tictactoe::select_move(&state, seat, difficulty, rng)?;
            serde_json::to_value(cell).ok()
        }
        connect_four::SLUG => {
            let state: ConnectFourState = deserialize(slug, state)?;
            let col = crate::connect_four::select_column(&state, seat, difficulty, rng)?;
            serde_json::to_value(col).ok()
        }
        gomoku::SLUG => {
            let state: GomokuState = deserialize(slug, state)?;
            let cell = crate::gomoku::select_cell(&state, seat, difficulty, rng)?;
            serde_json::to_value(cell).ok()
        }
        rps::SLUG => {
            let state: RpsState = deserialize(slug, state)?;
            if seat >= state.picks.len() || state.picks[seat].is_some() {
                return None;
            }
            if state.scores.iter().any(|&s| s >= state.target) {
                return None;
            }
            let history = crate::rps::opponent_history(&state, seat);
            let hand = crate::rps::select_hand(&history, difficulty, rng);
            serde_json::to_value(hand).ok()
        }
        _ => None,
    }
}

fn deserialize<T: serde::de::DeserializeOwned>(slug: &str, state: &Value) -> Option<T> {
    match serde_json::from_value(state.clone()) {
        Ok(state) => Some(state),
        Err(err) => {
            debug!("undeserializable {slug} state: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::game::GameModule;
    use shared::games::tictactoe::TicTacToe;

    #[test]
    fn dispatch_returns_a_legal_tictactoe_move() {
        let game = TicTacToe;
        let state = serde_json::to_value(game.initial_state(0)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mv = select_for_slug("tictactoe", &state, 0, Difficulty::Hard, &mut rng).unwrap();
        let cell: usize = serde_json::from_value(mv).unwrap();
        assert!(cell < 9);
    }

    #[test]
    fn unknown_slug_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_for_slug("chess", &Value::Null, 0, Difficulty::Easy, &mut rng).is_none());
    }

    #[test]
    fn rps_dispatch_respects_pending_picks() {
        let state = serde_json::json!({
            "picks": ["Rock", null],
            "history": [],
            "scores": [0, 0],
            "target": 3
        });
        let mut rng = StdRng::seed_from_u64(1);
        // Seat 0 already picked this round.
        assert!(select_for_slug("rps", &state, 0, Difficulty::Easy, &mut rng).is_none());
        assert!(select_for_slug("rps", &state, 1, Difficulty::Easy, &mut rng).is_some());
    }
}
