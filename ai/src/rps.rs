//! Rock-paper-scissors opponents.
//!
//! Easy is uniformly random. Medium and hard track the opponent's most
//! frequent hand and counter it with probability 0.6 and 0.8 respectively,
//! falling back to a uniform pick otherwise. With no history yet, they
//! assume a Rock opener and counter with Paper.

use rand::seq::SliceRandom;
use rand::Rng;

use shared::game::Difficulty;
use shared::games::rps::{Hand, RpsState, HANDS};

const MEDIUM_COUNTER_P: f64 = 0.6;
const HARD_COUNTER_P: f64 = 0.8;

/// Pick a hand given the opponent's resolved picks so far.
pub fn select_hand(
    opponent_history: &[Hand],
    difficulty: Difficulty,
    rng: &mut impl Rng,
) -> Hand {
    let counter_p = match difficulty {
        Difficulty::Easy => return random_hand(rng),
        Difficulty::Medium => MEDIUM_COUNTER_P,
        Difficulty::Hard => HARD_COUNTER_P,
    };
    if rng.gen_bool(counter_p) {
        most_frequent(opponent_history).counter()
    } else {
        random_hand(rng)
    }
}

/// The opponent's picks from `seat`'s point of view, oldest first.
pub fn opponent_history(state: &RpsState, seat: usize) -> Vec<Hand> {
    state
        .history
        .iter()
        .map(|&(a, b)| if seat == 0 { b } else { a })
        .collect()
}

fn random_hand(rng: &mut impl Rng) -> Hand {
    // HANDS is never empty.
    *HANDS.choose(rng).unwrap_or(&Hand::Rock)
}

fn most_frequent(history: &[Hand]) -> Hand {
    if history.is_empty() {
        // Most players open with Rock; countering it beats uniform play.
        return Hand::Rock;
    }
    let mut best = Hand::Rock;
    let mut best_count = 0;
    for hand in HANDS {
        let count = history.iter().filter(|&&h| h == hand).count();
        if count > best_count {
            best = hand;
            best_count = count;
        }
    }
    best
}
