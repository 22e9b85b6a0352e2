//! Three-card showdown opponents.
//!
//! The only decision is reveal or fold. Easy always reveals. Medium and
//! hard fold weak hands probabilistically, with hard folding junk more
//! aggressively but never folding three of a kind or better.

use rand::Rng;

use shared::game::Difficulty;
use shared::games::showdown::{evaluate, strength_score, Card, HandCategory, HAND_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Reveal,
    Fold,
}

/// Decide whether to reveal or fold the given hand.
pub fn decide(hand: &[Card; HAND_SIZE], difficulty: Difficulty, rng: &mut impl Rng) -> Action {
    let strength = evaluate(hand);
    let fold_factor = match difficulty {
        Difficulty::Easy => return Action::Reveal,
        Difficulty::Medium => 0.5,
        Difficulty::Hard => {
            if strength.category >= HandCategory::ThreeOfAKind {
                return Action::Reveal;
            }
            0.8
        }
    };
    let fold_p = (1.0 - strength_score(&strength)) * fold_factor;
    if rng.gen_bool(fold_p) {
        Action::Fold
    } else {
        Action::Reveal
    }
}
