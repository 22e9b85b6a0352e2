//! Gomoku (five in a row) on a 15x15 board. Seat 0 plays Black and moves
//! first. Exactly five or more contiguous stones win.

use serde::{Deserialize, Serialize};

use crate::game::{GameModule, Outcome};

pub const SLUG: &str = "gomoku";
pub const SIZE: usize = 15;
pub const CELLS: usize = SIZE * SIZE;
pub const CENTER: usize = (SIZE / 2) * SIZE + SIZE / 2;
pub const WIN_LEN: usize = 5;

/// Scan directions: east, south, south-east, south-west.
pub const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stone {
    Black,
    White,
}

impl Stone {
    pub fn other(self) -> Stone {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }

    pub fn seat(self) -> usize {
        match self {
            Stone::Black => 0,
            Stone::White => 1,
        }
    }

    pub fn from_seat(seat: usize) -> Option<Stone> {
        match seat {
            0 => Some(Stone::Black),
            1 => Some(Stone::White),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GomokuState {
    pub board: Vec<Option<Stone>>,
    pub current_turn: Stone,
    pub move_count: u32,
}

pub fn index(row: usize, col: usize) -> usize {
    row * SIZE + col
}

fn at(board: &[Option<Stone>], row: isize, col: isize) -> Option<Stone> {
    if row < 0 || col < 0 || row >= SIZE as isize || col >= SIZE as isize {
        return None;
    }
    board[index(row as usize, col as usize)]
}

/// Length of the contiguous run of `stone` through `(row, col)` along one
/// direction, counting the cell itself.
pub fn run_length(board: &[Option<Stone>], row: usize, col: usize, dir: (isize, isize)) -> usize {
    let stone = match board[index(row, col)] {
        Some(s) => s,
        None => return 0,
    };
    let mut len = 1;
    for sign in [1isize, -1] {
        let mut r = row as isize + dir.0 * sign;
        let mut c = col as isize + dir.1 * sign;
        while at(board, r, c) == Some(stone) {
            len += 1;
            r += dir.0 * sign;
            c += dir.1 * sign;
        }
    }
    len
}

pub fn winner(board: &[Option<Stone>]) -> Option<Stone> {
    for row in 0..SIZE {
        for col in 0..SIZE {
            if let Some(stone) = board[index(row, col)] {
                for dir in DIRECTIONS {
                    // Only count runs from their first cell to avoid rescans.
                    let prev = at(board, row as isize - dir.0, col as isize - dir.1);
                    if prev == Some(stone) {
                        continue;
                    }
                    if run_length(board, row, col, dir) >= WIN_LEN {
                        return Some(stone);
                    }
                }
            }
        }
    }
    None
}

/// Empty cells within one step of an existing stone.
pub fn adjacent_empties(board: &[Option<Stone>]) -> Vec<usize> {
    let mut out = Vec::new();
    for row in 0..SIZE {
        for col in 0..SIZE {
            if board[index(row, col)].is_some() {
                continue;
            }
            let near_stone = (-1..=1).any(|dr: isize| {
                (-1..=1).any(|dc: isize| {
                    !(dr == 0 && dc == 0) && at(board, row as isize + dr, col as isize + dc).is_some()
                })
            });
            if near_stone {
                out.push(index(row, col));
            }
        }
    }
    out
}

pub struct Gomoku;

impl GameModule for Gomoku {
    type State = GomokuState;
    type Move = usize;

    fn slug(&self) -> &'static str {
        SLUG
    }

    fn initial_state(&self, _seed: u64) -> GomokuState {
        GomokuState {
            board: vec![None; CELLS],
            current_turn: Stone::Black,
            move_count: 0,
        }
    }

    fn turn(&self, state: &GomokuState) -> Option<usize> {
        if self.is_terminal(state).is_some() {
            None
        } else {
            Some(state.current_turn.seat())
        }
    }

    fn legal_moves(&self, state: &GomokuState) -> Vec<usize> {
        if self.is_terminal(state).is_some() {
            return Vec::new();
        }
        (0..CELLS).filter(|&i| state.board[i].is_none()).collect()
    }

    fn apply_move(&self, state: &GomokuState, seat: usize, mv: &usize) -> Option<GomokuState> {
        let stone = Stone::from_seat(seat)?;
        if stone != state.current_turn
            || *mv >= CELLS
            || state.board[*mv].is_some()
            || self.is_terminal(state).is_some()
        {
            return None;
        }
        let mut next = state.clone();
        next.board[*mv] = Some(stone);
        next.current_turn = stone.other();
        next.move_count += 1;
        Some(next)
    }

    fn is_terminal(&self, state: &GomokuState) -> Option<Outcome> {
        if let Some(stone) = winner(&state.board) {
            return Some(Outcome::Win { seat: stone.seat() });
        }
        if state.move_count as usize >= CELLS {
            return Some(Outcome::Draw);
        }
        None
    }
}
