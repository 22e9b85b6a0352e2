//! Coin-flip and dice opponents.
//!
//! Pure-chance games have no decisions to improve, so every tier returns
//! an unbiased outcome. The difficulty parameter is accepted for interface
//! symmetry and ignored.

use rand::Rng;

use shared::game::Difficulty;
use shared::games::chance::{flip_coin, roll_die, CoinFace};

pub fn select_coin_face(_difficulty: Difficulty, rng: &mut impl Rng) -> CoinFace {
    flip_coin(rng)
}

pub fn select_die_roll(_difficulty: Difficulty, rng: &mut impl Rng) -> u8 {
    roll_die(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn tiers_share_one_distribution() {
        // Same seed, any tier: identical outcome stream.
        let mut a = StdRng::seed_from_u64(21);
        let mut b = StdRng::seed_from_u64(21);
        for _ in 0..50 {
            assert_eq!(
                select_die_roll(Difficulty::Easy, &mut a),
                select_die_roll(Difficulty::Hard, &mut b)
            );
        }
    }
}
