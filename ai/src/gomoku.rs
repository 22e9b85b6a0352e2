//! Gomoku opponents.
//!
//! All tiers confine their candidates to empty cells adjacent to an
//! existing stone (or the center on an empty board), which keeps the
//! 225-cell board tractable. Easy picks among those at random. Medium
//! takes a win, blocks one, then extends its longest run. Hard scores each
//! candidate with a both-colors window evaluation one ply deep.

use rand::seq::SliceRandom;
use rand::Rng;

use shared::game::{Difficulty, GameModule};
use shared::games::gomoku::{
    adjacent_empties, index, run_length, winner, Gomoku, GomokuState, Stone, CENTER, DIRECTIONS,
    SIZE, WIN_LEN,
};

/// Open-run weights by stone count; a five is decisive.
const RUN_WEIGHTS: [i64; 6] = [0, 1, 8, 64, 512, 100_000];

/// Pick a cell for `seat`, or `None` when the position has no legal moves.
pub fn select_cell(
    state: &GomokuState,
    seat: usize,
    difficulty: Difficulty,
    rng: &mut impl Rng,
) -> Option<usize> {
    let game = Gomoku;
    if game.turn(state) != Some(seat) {
        return None;
    }
    let candidates = candidate_cells(&state.board);
    if candidates.is_empty() {
        return None;
    }
    let stone = Stone::from_seat(seat)?;
    match difficulty {
        Difficulty::Easy => candidates.choose(rng).copied(),
        Difficulty::Medium => {
            winning_cell(&state.board, stone, &candidates)
                .or_else(|| winning_cell(&state.board, stone.other(), &candidates))
                .or_else(|| longest_run_cell(&state.board, stone, &candidates))
        }
        Difficulty::Hard => {
            winning_cell(&state.board, stone, &candidates)
                .or_else(|| winning_cell(&state.board, stone.other(), &candidates))
                .or_else(|| best_evaluated_cell(&state.board, stone, &candidates))
        }
    }
}

fn candidate_cells(board: &[Option<Stone>]) -> Vec<usize> {
    if board.iter().all(|c| c.is_none()) {
        return vec![CENTER];
    }
    adjacent_empties(board)
}

/// First candidate that completes five in a row for `stone`.
fn winning_cell(board: &[Option<Stone>], stone: Stone, candidates: &[usize]) -> Option<usize> {
    for &cell in candidates {
        let mut trial = board.to_vec();
        trial[cell] = Some(stone);
        if winner(&trial) == Some(stone) {
            return Some(cell);
        }
    }
    None
}

/// Candidate producing the longest own run through the placed stone.
fn longest_run_cell(board: &[Option<Stone>], stone: Stone, candidates: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for &cell in candidates {
        let mut trial = board.to_vec();
        trial[cell] = Some(stone);
        let run = DIRECTIONS
            .iter()
            .map(|&dir| run_length(&trial, cell / SIZE, cell % SIZE, dir))
            .max()
            .unwrap_or(0);
        if best.map_or(true, |(_, r)| run > r) {
            best = Some((cell, run));
        }
    }
    best.map(|(cell, _)| cell)
}

fn best_evaluated_cell(
    board: &[Option<Stone>],
    stone: Stone,
    candidates: &[usize],
) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for &cell in candidates {
        let mut trial = board.to_vec();
        trial[cell] = Some(stone);
        let score = evaluate(&trial, stone);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((cell, score));
        }
    }
    best.map(|(cell, _)| cell)
}

/// Window evaluation from `stone`'s perspective. Every length-5 window that
/// holds only one color scores by its stone count; opponent windows weigh
/// slightly heavier so unanswered threats dominate equal-length own runs.
pub fn evaluate(board: &[Option<Stone>], stone: Stone) -> i64 {
    let mut score = 0;
    for row in 0..SIZE {
        for col in 0..SIZE {
            for dir in DIRECTIONS {
                let end_row = row as isize + dir.0 * (WIN_LEN as isize - 1);
                let end_col = col as isize + dir.1 * (WIN_LEN as isize - 1);
                if end_row < 0
                    || end_col < 0
                    || end_row >= SIZE as isize
                    || end_col >= SIZE as isize
                {
                    continue;
                }
                let mut own = 0;
                let mut opp = 0;
                for k in 0..WIN_LEN as isize {
                    let r = (row as isize + dir.0 * k) as usize;
                    let c = (col as isize + dir.1 * k) as usize;
                    match board[index(r, c)] {
                        Some(s) if s == stone => own += 1,
                        Some(_) => opp += 1,
                        None => {}
                    }
                }
                if opp == 0 {
                    score += RUN_WEIGHTS[own];
                } else if own == 0 {
                    score -= RUN_WEIGHTS[opp] * 2;
                }
            }
        }
    }
    score
}
