//! Pure-chance outcomes: coin flips and dice rolls.
//!
//! These games deliberately have no strategy surface; the engine layer
//! returns an unbiased random outcome at every difficulty tier.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinFace {
    Heads,
    Tails,
}

pub fn flip_coin(rng: &mut impl Rng) -> CoinFace {
    if rng.gen_bool(0.5) {
        CoinFace::Heads
    } else {
        CoinFace::Tails
    }
}

/// A standard six-sided die roll, 1 through 6 inclusive.
pub fn roll_die(rng: &mut impl Rng) -> u8 {
    rng.gen_range(1..=6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn die_rolls_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let roll = roll_die(&mut rng);
            assert!((1..=6).contains(&roll));
        }
    }

    #[test]
    fn coin_lands_on_both_faces() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut heads = 0;
        let mut tails = 0;
        for _ in 0..1_000 {
            match flip_coin(&mut rng) {
                CoinFace::Heads => heads += 1,
                CoinFace::Tails => tails += 1,
            }
        }
        assert!(heads > 0 && tails > 0);
    }
}
