//! Tic-tac-toe opponents.
//!
//! Easy picks a uniformly random empty cell. Medium takes an immediate win,
//! blocks an immediate loss, prefers the center, then falls back to random.
//! Hard searches the full game tree with minimax and never loses.

use rand::seq::SliceRandom;
use rand::Rng;

use shared::game::{Difficulty, GameModule, Outcome};
use shared::games::tictactoe::{Mark, TicTacToe, TicTacToeState, CENTER};

/// Pick a cell for `seat`, or `None` when the position has no legal moves.
pub fn select_move(
    state: &TicTacToeState,
    seat: usize,
    difficulty: Difficulty,
    rng: &mut impl Rng,
) -> Option<usize> {
    let game = TicTacToe;
    let moves = game.legal_moves(state);
    if moves.is_empty() || game.turn(state) != Some(seat) {
        return None;
    }
    match difficulty {
        Difficulty::Easy => moves.choose(rng).copied(),
        Difficulty::Medium => select_medium(state, seat, &moves, rng),
        Difficulty::Hard => select_hard(state, seat),
    }
}

fn select_medium(
    state: &TicTacToeState,
    seat: usize,
    moves: &[usize],
    rng: &mut impl Rng,
) -> Option<usize> {
    let game = TicTacToe;
    // Win now if possible.
    for &cell in moves {
        if let Some(next) = game.apply_move(state, seat, &cell) {
            if game.is_terminal(&next) == Some(Outcome::Win { seat }) {
                return Some(cell);
            }
        }
    }
    // Block the opponent's winning cell.
    let them = 1 - seat;
    let their_mark = Mark::from_seat(them)?;
    for &cell in moves {
        let mut board = state.board.clone();
        board[cell] = Some(their_mark);
        if shared::games::tictactoe::winner(&board) == Some(their_mark) {
            return Some(cell);
        }
    }
    if moves.contains(&CENTER) {
        return Some(CENTER);
    }
    moves.choose(rng).copied()
}

fn select_hard(state: &TicTacToeState, seat: usize) -> Option<usize> {
    let game = TicTacToe;
    let mut best: Option<(usize, i32)> = None;
    for cell in game.legal_moves(state) {
        let next = game.apply_move(state, seat, &cell)?;
        let score = minimax(&next, seat, 1);
        // Strict greater-than keeps the first-found cell on ties, so the
        // reply to a given position is stable across runs.
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((cell, score));
        }
    }
    best.map(|(cell, _)| cell)
}

/// Full-depth minimax from `seat`'s perspective. Wins score `10 - depth`
/// and losses `-(10 - depth)`, so faster wins and slower losses are
/// preferred. Draws score zero.
fn minimax(state: &TicTacToeState, seat: usize, depth: i32) -> i32 {
    let game = TicTacToe;
    match game.is_terminal(state) {
        Some(Outcome::Win { seat: w }) if w == seat => return 10 - depth,
        Some(Outcome::Win { .. }) => return -(10 - depth),
        Some(Outcome::Draw) => return 0,
        None => {}
    }
    let mover = state.current_turn.seat();
    let mut best = if mover == seat { i32::MIN } else { i32::MAX };
    for cell in game.legal_moves(state) {
        if let Some(next) = game.apply_move(state, mover, &cell) {
            let score = minimax(&next, seat, depth + 1);
            if mover == seat {
                best = best.max(score);
            } else {
                best = best.min(score);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::games::tictactoe::CORNERS;

    fn play(moves: &[(usize, usize)]) -> TicTacToeState {
        let game = TicTacToe;
        let mut state = game.initial_state(0);
        for &(seat, cell) in moves {
            state = game.apply_move(&state, seat, &cell).expect("legal move");
        }
        state
    }

    #[test]
    fn medium_takes_the_winning_cell() {
        // X at 0 and 1, O at 3 and 4; X to move must play 2.
        let state = play(&[(0, 0), (1, 3), (0, 1), (1, 4)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            select_move(&state, 0, Difficulty::Medium, &mut rng),
            Some(2)
        );
    }

    #[test]
    fn medium_blocks_an_immediate_loss() {
        // X threatens 0-1-2; O must block at 2.
        let state = play(&[(0, 0), (1, 4), (0, 1)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            select_move(&state, 1, Difficulty::Medium, &mut rng),
            Some(2)
        );
    }

    #[test]
    fn hard_answers_a_center_opening_with_a_corner() {
        let state = play(&[(0, CENTER)]);
        let mut rng = StdRng::seed_from_u64(1);
        let reply = select_move(&state, 1, Difficulty::Hard, &mut rng).unwrap();
        assert!(CORNERS.contains(&reply), "expected a corner, got {reply}");
    }

    #[test]
    fn hard_self_play_always_draws() {
        let game = TicTacToe;
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = game.initial_state(0);
        while let Some(seat) = game.turn(&state) {
            let cell = select_move(&state, seat, Difficulty::Hard, &mut rng).unwrap();
            state = game.apply_move(&state, seat, &cell).unwrap();
        }
        assert_eq!(game.is_terminal(&state), Some(Outcome::Draw));
    }

    #[test]
    fn off_turn_requests_return_none() {
        let game = TicTacToe;
        let state = game.initial_state(0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_move(&state, 1, Difficulty::Easy, &mut rng), None);
    }
}
