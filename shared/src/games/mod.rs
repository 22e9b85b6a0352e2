//! Concrete game rule modules.

pub mod chance;
pub mod connect_four;
pub mod gomoku;
pub mod rps;
pub mod showdown;
pub mod tictactoe;

use crate::game::{Erased, ErasedGame};

/// Look up a game module by its room `game_slug`.
///
/// Only the games listed here are playable through a room. The chance
/// and showdown modules carry no slug: they back engine-level opponents
/// directly.
pub fn by_slug(slug: &str) -> Option<Box<dyn ErasedGame>> {
    match slug {
        tictactoe::SLUG => Some(Box::new(Erased(tictactoe::TicTacToe))),
        connect_four::SLUG => Some(Box::new(Erased(connect_four::ConnectFour))),
        gomoku::SLUG => Some(Box::new(Erased(gomoku::Gomoku))),
        rps::SLUG => Some(Box::new(Erased(rps::RockPaperScissors))),
        _ => None,
    }
}
