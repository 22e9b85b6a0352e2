//! Computer opponents for the built-in games.
//!
//! Each module exposes one `select_*` function taking the game state, the
//! AI's seat, a [`Difficulty`] tier and a caller-supplied [`rand::Rng`].
//! Injecting the RNG keeps every engine deterministic under a seeded
//! generator, which is what the tests and replay paths rely on.
//! [`engine::select_for_slug`] dispatches over serialized state for callers
//! that only know the room's game slug.

pub mod chance;
pub mod connect_four;
pub mod engine;
pub mod gomoku;
pub mod rps;
pub mod showdown;
pub mod tictactoe;

pub use shared::game::Difficulty;
