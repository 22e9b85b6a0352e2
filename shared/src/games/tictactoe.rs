//! Tic-tac-toe rules. Seat 0 plays X and always moves first.

use serde::{Deserialize, Serialize};

use crate::game::{GameModule, Outcome};

pub const SLUG: &str = "tictactoe";
pub const CELLS: usize = 9;
pub const CENTER: usize = 4;
pub const CORNERS: [usize; 4] = [0, 2, 6, 8];

pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn seat(self) -> usize {
        match self {
            Mark::X => 0,
            Mark::O => 1,
        }
    }

    pub fn from_seat(seat: usize) -> Option<Mark> {
        match seat {
            0 => Some(Mark::X),
            1 => Some(Mark::O),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicTacToeState {
    /// Flat 3x3 board, row-major.
    pub board: Vec<Option<Mark>>,
    pub current_turn: Mark,
    pub move_count: u32,
}

pub fn winner(board: &[Option<Mark>]) -> Option<Mark> {
    for line in &WIN_LINES {
        if let Some(mark) = board[line[0]] {
            if board[line[1]] == Some(mark) && board[line[2]] == Some(mark) {
                return Some(mark);
            }
        }
    }
    None
}

pub struct TicTacToe;

impl GameModule for TicTacToe {
    type State = TicTacToeState;
    type Move = usize;

    fn slug(&self) -> &'static str {
        SLUG
    }

    fn initial_state(&self, _seed: u64) -> TicTacToeState {
        TicTacToeState {
            board: vec![None; CELLS],
            current_turn: Mark::X,
            move_count: 0,
        }
    }

    fn turn(&self, state: &TicTacToeState) -> Option<usize> {
        if self.is_terminal(state).is_some() {
            None
        } else {
            Some(state.current_turn.seat())
        }
    }

    fn legal_moves(&self, state: &TicTacToeState) -> Vec<usize> {
        if self.is_terminal(state).is_some() {
            return Vec::new();
        }
        (0..CELLS).filter(|&i| state.board[i].is_none()).collect()
    }

    fn apply_move(
        &self,
        state: &TicTacToeState,
        seat: usize,
        mv: &usize,
    ) -> Option<TicTacToeState> {
        let mark = Mark::from_seat(seat)?;
        if mark != state.current_turn
            || *mv >= CELLS
            || state.board[*mv].is_some()
            || self.is_terminal(state).is_some()
        {
            return None;
        }
        let mut next = state.clone();
        next.board[*mv] = Some(mark);
        next.current_turn = mark.other();
        next.move_count += 1;
        Some(next)
    }

    fn is_terminal(&self, state: &TicTacToeState) -> Option<Outcome> {
        if let Some(mark) = winner(&state.board) {
            return Some(Outcome::Win { seat: mark.seat() });
        }
        if state.move_count as usize >= CELLS {
            return Some(Outcome::Draw);
        }
        None
    }
}
