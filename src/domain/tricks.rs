//! Trick comparison and resolution.

use std::cmp::Ordering;

use crate::domain::cards::{Card, Suit};
use crate::domain::PlayerId;

/// Whether `a` beats `b` within a trick led in `lead`, with an optional trump.
///
/// Trump beats non-trump; lead beats non-lead non-trump; within a suit the
/// higher rank wins; an off-suit non-trump card never wins.
pub fn card_beats(a: Card, b: Card, lead: Suit, trump: Option<Suit>) -> bool {
    if let Some(trump) = trump {
        let a_trump = a.suit == trump;
        let b_trump = b.suit == trump;
        if a_trump != b_trump {
            return a_trump;
        }
        if a_trump && b_trump {
            return a.rank > b.rank;
        }
    }
    let a_follows = a.suit == lead;
    let b_follows = b.suit == lead;
    if a_follows != b_follows {
        return a_follows;
    }
    a_follows && a.rank > b.rank
}

/// Total comparison of two cards within a trick. Ties are impossible for
/// distinct cards; `Equal` is only returned when `a == b`.
pub fn compare_in_trick(a: Card, b: Card, lead: Suit, trump: Option<Suit>) -> Ordering {
    if a == b {
        Ordering::Equal
    } else if card_beats(a, b, lead, trump) {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Resolve a complete trick to its winner. Returns `None` for an empty trick.
pub fn trick_winner(
    plays: &[(PlayerId, Card)],
    lead: Suit,
    trump: Option<Suit>,
) -> Option<PlayerId> {
    let mut best = plays.first()?;
    for play in &plays[1..] {
        if card_beats(play.1, best.1, lead, trump) {
            best = play;
        }
    }
    Some(best.0)
}
