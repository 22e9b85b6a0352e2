//! Connect-four rules on the standard 7x6 grid.
//!
//! The board is a flat row-major array; row 0 is the top, row 5 the bottom.
//! A move is a column index, and the disc settles into the lowest empty row.
//! Seat 0 plays Red and moves first.

use serde::{Deserialize, Serialize};

use crate::game::{GameModule, Outcome};

pub const SLUG: &str = "connect-four";
pub const COLS: usize = 7;
pub const ROWS: usize = 6;
pub const CELLS: usize = COLS * ROWS;
pub const CENTER_COL: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disc {
    Red,
    Yellow,
}

impl Disc {
    pub fn other(self) -> Disc {
        match self {
            Disc::Red => Disc::Yellow,
            Disc::Yellow => Disc::Red,
        }
    }

    pub fn seat(self) -> usize {
        match self {
            Disc::Red => 0,
            Disc::Yellow => 1,
        }
    }

    pub fn from_seat(seat: usize) -> Option<Disc> {
        match seat {
            0 => Some(Disc::Red),
            1 => Some(Disc::Yellow),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectFourState {
    pub board: Vec<Option<Disc>>,
    pub current_turn: Disc,
    pub move_count: u32,
}

pub fn index(row: usize, col: usize) -> usize {
    row * COLS + col
}

/// Lowest empty row in `col`, or `None` when the column is full.
pub fn drop_row(board: &[Option<Disc>], col: usize) -> Option<usize> {
    (0..ROWS).rev().find(|&row| board[index(row, col)].is_none())
}

/// Columns that can still accept a disc, in ascending order. Search engines
/// rely on this iteration order for their first-found tie-break.
pub fn valid_columns(board: &[Option<Disc>]) -> Vec<usize> {
    (0..COLS).filter(|&c| drop_row(board, c).is_some()).collect()
}

/// Every 4-in-a-row window on the board: horizontal, vertical and both
/// diagonals. 69 windows in total.
pub fn all_windows() -> Vec<[usize; 4]> {
    let mut windows = Vec::with_capacity(69);
    for row in 0..ROWS {
        for col in 0..=COLS - 4 {
            windows.push([
                index(row, col),
                index(row, col + 1),
                index(row, col + 2),
                index(row, col + 3),
            ]);
        }
    }
    for col in 0..COLS {
        for row in 0..=ROWS - 4 {
            windows.push([
                index(row, col),
                index(row + 1, col),
                index(row + 2, col),
                index(row + 3, col),
            ]);
        }
    }
    for row in 0..=ROWS - 4 {
        for col in 0..=COLS - 4 {
            windows.push([
                index(row, col),
                index(row + 1, col + 1),
                index(row + 2, col + 2),
                index(row + 3, col + 3),
            ]);
            windows.push([
                index(row + 3, col),
                index(row + 2, col + 1),
                index(row + 1, col + 2),
                index(row, col + 3),
            ]);
        }
    }
    windows
}

pub fn winner(board: &[Option<Disc>]) -> Option<Disc> {
    for window in all_windows() {
        if let Some(disc) = board[window[0]] {
            if window[1..].iter().all(|&i| board[i] == Some(disc)) {
                return Some(disc);
            }
        }
    }
    None
}

pub struct ConnectFour;

impl GameModule for ConnectFour {
    type State = ConnectFourState;
    type Move = usize;

    fn slug(&self) -> &'static str {
        SLUG
    }

    fn initial_state(&self, _seed: u64) -> ConnectFourState {
        ConnectFourState {
            board: vec![None; CELLS],
            current_turn: Disc::Red,
            move_count: 0,
        }
    }

    fn turn(&self, state: &ConnectFourState) -> Option<usize> {
        if self.is_terminal(state).is_some() {
            None
        } else {
            Some(state.current_turn.seat())
        }
    }

    fn legal_moves(&self, state: &ConnectFourState) -> Vec<usize> {
        if self.is_terminal(state).is_some() {
            return Vec::new();
        }
        valid_columns(&state.board)
    }

    fn apply_move(
        &self,
        state: &ConnectFourState,
        seat: usize,
        mv: &usize,
    ) -> Option<ConnectFourState> {
        let disc = Disc::from_seat(seat)?;
        if disc != state.current_turn || *mv >= COLS || self.is_terminal(state).is_some() {
            return None;
        }
        let row = drop_row(&state.board, *mv)?;
        let mut next = state.clone();
        next.board[index(row, *mv)] = Some(disc);
        next.current_turn = disc.other();
        next.move_count += 1;
        Some(next)
    }

    fn is_terminal(&self, state: &ConnectFourState) -> Option<Outcome> {
        if let Some(disc) = winner(&state.board) {
            return Some(Outcome::Win { seat: disc.seat() });
        }
        if state.move_count as usize >= CELLS {
            return Some(Outcome::Draw);
        }
        None
    }
}
