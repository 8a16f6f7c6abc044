//! Seat rotation math, bid legality, and the round schedule.
//!
//! These helpers are the single source of truth for "who acts next" and for
//! when a game runs out of deck.

/// Seat index `steps` seats clockwise from `seat` at an `n`-player table.
#[inline]
pub fn seat_after(seat: usize, steps: usize, n: usize) -> usize {
    (seat + steps) % n
}

/// First bidder (and first player of the round): left of the dealer.
#[inline]
pub fn first_bidder(dealer: usize, n: usize) -> usize {
    seat_after(dealer, 1, n)
}

/// Whether a round of `cards_per_player` can be dealt to `n` players.
#[inline]
pub fn round_fits_deck(cards_per_player: u8, n: usize) -> bool {
    cards_per_player as usize * n <= 52
}

/// The bid value forbidden to the dealer (last bidder), if any: the value
/// that would bring the bid sum to exactly `cards_per_player`.
pub fn forbidden_last_bid(cards_per_player: u8, bids_so_far: u32) -> Option<u8> {
    let k = cards_per_player as u32;
    if bids_so_far > k {
        return None;
    }
    Some((k - bids_so_far) as u8)
}

/// All legal bids for a player: `0..=k`, minus the forbidden value when the
/// player is the last bidder.
pub fn legal_bids(cards_per_player: u8, bids_so_far: u32, is_last_bidder: bool) -> Vec<u8> {
    let forbidden = if is_last_bidder {
        forbidden_last_bid(cards_per_player, bids_so_far)
    } else {
        None
    };
    (0..=cards_per_player)
        .filter(|b| Some(*b) != forbidden)
        .collect()
}
