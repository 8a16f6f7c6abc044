//! Core card types: Suit, Rank, Card.

use serde::{Deserialize, Serialize};

/// Suit order (Clubs < Diamonds < Hearts < Spades) is only meaningful for
/// stable hand sorting and the auto-play tiebreak; trick resolution goes
/// through lead/trump comparison instead.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }
}

// Ord on Card is suit-then-rank, for stable hand sorting only.
impl Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.suit.cmp(&other.suit) {
            std::cmp::Ordering::Equal => self.rank.cmp(&other.rank),
            ord => ord,
        }
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_serializes_as_object() {
        let card = Card::new(Suit::Hearts, Rank::Five);
        let json = serde_json::to_value(card).unwrap();
        assert_eq!(json, serde_json::json!({"suit": "Hearts", "rank": "Five"}));
    }

    #[test]
    fn card_deserializes_from_object() {
        let card: Card = serde_json::from_str(r#"{"suit":"Spades","rank":"Ace"}"#).unwrap();
        assert_eq!(card, Card::new(Suit::Spades, Rank::Ace));
    }

    #[test]
    fn rank_order_two_lowest_ace_highest() {
        assert!(Rank::Two < Rank::Three);
        assert!(Rank::Ten < Rank::Jack);
        assert!(Rank::King < Rank::Ace);
    }

    #[test]
    fn suit_order_for_tiebreaks() {
        assert!(Suit::Clubs < Suit::Diamonds);
        assert!(Suit::Diamonds < Suit::Hearts);
        assert!(Suit::Hearts < Suit::Spades);
    }

    #[test]
    fn card_sort_is_suit_then_rank() {
        let mut cards = vec![
            Card::new(Suit::Spades, Rank::Two),
            Card::new(Suit::Clubs, Rank::Ace),
            Card::new(Suit::Clubs, Rank::Two),
        ];
        cards.sort();
        assert_eq!(
            cards,
            vec![
                Card::new(Suit::Clubs, Rank::Two),
                Card::new(Suit::Clubs, Rank::Ace),
                Card::new(Suit::Spades, Rank::Two),
            ]
        );
    }
}
