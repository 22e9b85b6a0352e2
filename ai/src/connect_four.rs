//! Connect-four opponents.
//!
//! Easy drops into a random valid column. Medium takes an immediate win,
//! blocks an immediate loss, prefers the center column, then plays
//! randomly. Hard runs a depth-bounded alpha-beta search over a windowed
//! static evaluation.

use rand::seq::SliceRandom;
use rand::Rng;

use shared::game::{Difficulty, GameModule, Outcome};
use shared::games::connect_four::{
    all_windows, valid_columns, ConnectFour, ConnectFourState, Disc, CENTER_COL, COLS, ROWS,
};

pub const HARD_DEPTH: u32 = 5;

/// Winning lines dominate every positional score. Subtracting the move
/// count makes nearer wins score higher than distant ones.
const WIN_BASE: i32 = 1_000_000;

/// Pick a column for `seat`, or `None` when the position has no legal moves.
pub fn select_column(
    state: &ConnectFourState,
    seat: usize,
    difficulty: Difficulty,
    rng: &mut impl Rng,
) -> Option<usize> {
    let game = ConnectFour;
    let moves = game.legal_moves(state);
    if moves.is_empty() || game.turn(state) != Some(seat) {
        return None;
    }
    match difficulty {
        Difficulty::Easy => moves.choose(rng).copied(),
        Difficulty::Medium => select_medium(state, seat, &moves, rng),
        Difficulty::Hard => search_best(state, seat, HARD_DEPTH, true).map(|(col, _)| col),
    }
}

fn select_medium(
    state: &ConnectFourState,
    seat: usize,
    moves: &[usize],
    rng: &mut impl Rng,
) -> Option<usize> {
    let game = ConnectFour;
    for &col in moves {
        if let Some(next) = game.apply_move(state, seat, &col) {
            if game.is_terminal(&next) == Some(Outcome::Win { seat }) {
                return Some(col);
            }
        }
    }
    // Block: would the opponent win by taking this column next turn?
    let them = 1 - seat;
    for &col in moves {
        let mut hypothetical = state.clone();
        hypothetical.current_turn = Disc::from_seat(them)?;
        if let Some(next) = game.apply_move(&hypothetical, them, &col) {
            if game.is_terminal(&next) == Some(Outcome::Win { seat: them }) {
                return Some(col);
            }
        }
    }
    if moves.contains(&CENTER_COL) {
        return Some(CENTER_COL);
    }
    moves.choose(rng).copied()
}

/// Best root move for `seat` at the given depth, with its score. Columns
/// are scanned ascending and ties keep the first find. `prune` toggles
/// alpha-beta cutoffs; the exhaustive variant exists so tests can check
/// that pruning never changes the chosen move.
pub fn search_best(
    state: &ConnectFourState,
    seat: usize,
    depth: u32,
    prune: bool,
) -> Option<(usize, i32)> {
    let game = ConnectFour;
    if game.turn(state) != Some(seat) {
        return None;
    }
    let mut best: Option<(usize, i32)> = None;
    let mut alpha = i32::MIN;
    for col in valid_columns(&state.board) {
        let next = game.apply_move(state, seat, &col)?;
        let score = minimax(&next, seat, depth, alpha, i32::MAX, prune);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((col, score));
            alpha = alpha.max(score);
        }
    }
    best
}

fn minimax(
    state: &ConnectFourState,
    seat: usize,
    depth: u32,
    mut alpha: i32,
    mut beta: i32,
    prune: bool,
) -> i32 {
    let game = ConnectFour;
    match game.is_terminal(state) {
        Some(Outcome::Win { seat: w }) if w == seat => {
            return WIN_BASE - state.move_count as i32
        }
        Some(Outcome::Win { .. }) => return -(WIN_BASE - state.move_count as i32),
        Some(Outcome::Draw) => return 0,
        None => {}
    }
    if depth == 0 {
        return evaluate(state, seat);
    }
    let mover = state.current_turn.seat();
    let maximizing = mover == seat;
    let mut best = if maximizing { i32::MIN } else { i32::MAX };
    for col in valid_columns(&state.board) {
        let next = match game.apply_move(state, mover, &col) {
            Some(next) => next,
            None => continue,
        };
        let score = minimax(&next, seat, depth - 1, alpha, beta, prune);
        if maximizing {
            best = best.max(score);
            alpha = alpha.max(best);
        } else {
            best = best.min(score);
            beta = beta.min(best);
        }
        if prune && beta <= alpha {
            break;
        }
    }
    best
}

/// Static score of a non-terminal position from `seat`'s perspective.
/// Center-column discs are worth 3 each; each 4-window scores +5 for three
/// own discs with a gap, +2 for two with two gaps, and -4 when the
/// opponent has three with a gap.
pub fn evaluate(state: &ConnectFourState, seat: usize) -> i32 {
    let mine = match Disc::from_seat(seat) {
        Some(disc) => disc,
        None => return 0,
    };
    let theirs = mine.other();
    let board = &state.board;

    let mut score = 0;
    for row in 0..ROWS {
        if board[row * COLS + CENTER_COL] == Some(mine) {
            score += 3;
        }
    }
    for window in all_windows() {
        let mut own = 0;
        let mut opp = 0;
        let mut empty = 0;
        for &i in &window {
            match board[i] {
                Some(d) if d == mine => own += 1,
                Some(d) if d == theirs => opp += 1,
                _ => empty += 1,
            }
        }
        if own == 3 && empty == 1 {
            score += 5;
        } else if own == 2 && empty == 2 {
            score += 2;
        }
        if opp == 3 && empty == 1 {
            score -= 4;
        }
    }
    score
}
