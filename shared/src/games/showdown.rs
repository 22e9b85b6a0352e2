//! Three-card showdown: hidden hands, a reveal-or-fold decision, and a
//! simple poker-style hand ranking. Rules only; the fold/reveal strategy
//! lives in the engine layer.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const SLUG: &str = "showdown";
pub const HAND_SIZE: usize = 3;

pub const MIN_RANK: u8 = 2;
/// Ace ranks high.
pub const MAX_RANK: u8 = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

pub const SUITS: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// 2..=14, ace high.
    pub rank: u8,
    pub suit: Suit,
}

/// Hand categories in ascending strength. Derived ordering follows
/// declaration order, so comparisons work directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandCategory {
    HighCard,
    Pair,
    Flush,
    Straight,
    ThreeOfAKind,
    StraightFlush,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandStrength {
    pub category: HandCategory,
    /// Sum of card ranks; breaks ties within a category.
    pub points: u32,
}

/// Rank a three-card hand.
pub fn evaluate(cards: &[Card; HAND_SIZE]) -> HandStrength {
    let mut ranks: Vec<u8> = cards.iter().map(|c| c.rank).collect();
    ranks.sort_unstable();

    let flush = cards.iter().all(|c| c.suit == cards[0].suit);
    let straight = ranks[1] == ranks[0] + 1 && ranks[2] == ranks[1] + 1;
    let trips = ranks[0] == ranks[2];
    let pair = ranks[0] == ranks[1] || ranks[1] == ranks[2];

    let category = if straight && flush {
        HandCategory::StraightFlush
    } else if trips {
        HandCategory::ThreeOfAKind
    } else if straight {
        HandCategory::Straight
    } else if flush {
        HandCategory::Flush
    } else if pair {
        HandCategory::Pair
    } else {
        HandCategory::HighCard
    };

    HandStrength {
        category,
        points: ranks.iter().map(|&r| r as u32).sum(),
    }
}

const MAX_POINTS: f64 = (MAX_RANK as u32 * HAND_SIZE as u32) as f64;
const CATEGORY_WEIGHT: f64 = 50.0;

/// Normalize a hand strength to `0.0..=1.0` for probabilistic thresholds.
pub fn strength_score(strength: &HandStrength) -> f64 {
    let category = strength.category as usize as f64;
    (category * CATEGORY_WEIGHT + strength.points as f64)
        / (5.0 * CATEGORY_WEIGHT + MAX_POINTS)
}

/// Deal `hands` disjoint three-card hands from a shuffled 52-card deck.
pub fn deal(rng: &mut impl Rng, hands: usize) -> Vec<[Card; HAND_SIZE]> {
    let mut deck: Vec<Card> = SUITS
        .iter()
        .flat_map(|&suit| (MIN_RANK..=MAX_RANK).map(move |rank| Card { rank, suit }))
        .collect();
    deck.shuffle(rng);

    deck.chunks_exact(HAND_SIZE)
        .take(hands)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hand(cards: [(u8, Suit); 3]) -> [Card; 3] {
        cards.map(|(rank, suit)| Card { rank, suit })
    }

    #[test]
    fn categories_rank_in_order() {
        let high = evaluate(&hand([(2, Suit::Clubs), (7, Suit::Hearts), (11, Suit::Spades)]));
        let pair = evaluate(&hand([(7, Suit::Clubs), (7, Suit::Hearts), (11, Suit::Spades)]));
        let flush = evaluate(&hand([(2, Suit::Clubs), (7, Suit::Clubs), (11, Suit::Clubs)]));
        let straight = evaluate(&hand([(5, Suit::Clubs), (6, Suit::Hearts), (7, Suit::Spades)]));
        let trips = evaluate(&hand([(9, Suit::Clubs), (9, Suit::Hearts), (9, Suit::Spades)]));
        let sflush = evaluate(&hand([(5, Suit::Clubs), (6, Suit::Clubs), (7, Suit::Clubs)]));

        assert!(high.category < pair.category);
        assert!(pair.category < flush.category);
        assert!(flush.category < straight.category);
        assert!(straight.category < trips.category);
        assert!(trips.category < sflush.category);
    }

    #[test]
    fn strength_score_is_normalized_and_monotone() {
        let weakest = evaluate(&hand([(2, Suit::Clubs), (3, Suit::Hearts), (5, Suit::Spades)]));
        let strongest = evaluate(&hand([(12, Suit::Clubs), (13, Suit::Clubs), (14, Suit::Clubs)]));

        let low = strength_score(&weakest);
        let high = strength_score(&strongest);
        assert!((0.0..=1.0).contains(&low));
        assert!((0.0..=1.0).contains(&high));
        assert!(high > low);
    }

    #[test]
    fn deal_produces_disjoint_hands() {
        let mut rng = StdRng::seed_from_u64(5);
        let hands = deal(&mut rng, 4);
        assert_eq!(hands.len(), 4);

        let mut seen = Vec::new();
        for hand in &hands {
            for card in hand {
                assert!(!seen.contains(card), "card dealt twice: {card:?}");
                seen.push(*card);
            }
        }
    }
}
