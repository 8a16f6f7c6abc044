//! Deck construction, shuffling, and dealing.

use rand::seq::SliceRandom;

use crate::domain::cards::{Card, Rank, Suit};

/// A full 52-card deck in standard order.
pub fn full_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card { suit, rank });
        }
    }
    deck
}

/// A freshly shuffled 52-card deck.
///
/// `rand::rng()` is a CSPRNG and `shuffle` is Fisher-Yates, which together
/// give the uniform, cryptographically seeded permutation the game needs.
/// Deals are intentionally not reproducible.
pub fn new_shuffled_deck() -> Vec<Card> {
    let mut deck = full_deck();
    deck.shuffle(&mut rand::rng());
    deck
}

/// Deal `cards_per_player` cards to each of `players` hands in rotation,
/// starting with hand 0. Returns the hands (sorted for display) and the
/// undealt remainder in deck order.
pub fn deal(deck: &[Card], players: usize, cards_per_player: u8) -> (Vec<Vec<Card>>, Vec<Card>) {
    let k = cards_per_player as usize;
    debug_assert!(players * k <= deck.len(), "deal exceeds deck size");

    let mut hands = vec![Vec::with_capacity(k); players];
    for (i, &card) in deck.iter().take(players * k).enumerate() {
        hands[i % players].push(card);
    }
    for hand in &mut hands {
        hand.sort();
    }
    let remainder = deck[players * k..].to_vec();
    (hands, remainder)
}
