//! Property tests for trick resolution, bidding legality, and whole-game
//! conservation invariants.

use proptest::prelude::*;

use crate::domain::cards::{Card, Suit};
use crate::domain::rules::legal_bids;
use crate::domain::scoring::score_round;
use crate::domain::state::GameState;
use crate::domain::test_support::{drive_to_completion, seats};
use crate::domain::tricks::trick_winner;
use crate::domain::PlayerId;

fn arb_suit() -> impl Strategy<Value = Suit> {
    prop::sample::select(Suit::ALL.to_vec())
}

fn arb_trick(n: usize) -> impl Strategy<Value = Vec<(PlayerId, Card)>> {
    // Distinct deck indices guarantee distinct cards.
    prop::collection::hash_set(0usize..52, n).prop_map(|indices| {
        let deck = crate::domain::deck::full_deck();
        indices
            .into_iter()
            .map(|i| (uuid::Uuid::new_v4(), deck[i]))
            .collect()
    })
}

/// Reference implementation: highest trump wins, else highest lead card.
fn oracle_winner(
    plays: &[(PlayerId, Card)],
    lead: Suit,
    trump: Option<Suit>,
) -> PlayerId {
    let by_suit = |suit: Suit| {
        plays
            .iter()
            .filter(|(_, c)| c.suit == suit)
            .max_by_key(|(_, c)| c.rank)
            .map(|(p, _)| *p)
    };
    trump
        .and_then(|t| by_suit(t))
        .or_else(|| by_suit(lead))
        .expect("lead card always exists")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn trick_winner_matches_oracle(
        plays in (3usize..=4).prop_flat_map(arb_trick),
        trump in prop::option::of(arb_suit()),
    ) {
        let lead = plays[0].1.suit;
        let winner = trick_winner(&plays, lead, trump).unwrap();
        prop_assert_eq!(winner, oracle_winner(&plays, lead, trump));
    }

    #[test]
    fn score_sign_tracks_bid_accuracy(bid in 0u8..=17, tricks in 0u8..=17) {
        let score = score_round(bid, tricks);
        if bid == tricks {
            prop_assert_eq!(score, 10 + (bid as i32).pow(2));
        } else {
            let diff = (tricks as i32 - bid as i32).abs();
            prop_assert_eq!(score, -diff.pow(2));
            prop_assert!(score < 0);
        }
    }

    #[test]
    fn last_bidder_legality_never_sums_to_k(
        k in 1u8..=17,
        others in prop::collection::vec(0u8..=17, 2..=3),
    ) {
        let sum: u32 = others.iter().map(|b| *b as u32).sum();
        for bid in legal_bids(k, sum, true) {
            prop_assert_ne!(sum + bid as u32, k as u32);
        }
        // The dealer always has at least k choices left.
        prop_assert!(legal_bids(k, sum, true).len() >= k as usize);
    }
}

proptest! {
    // Whole games are expensive; a handful of random walks is plenty.
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn random_games_conserve_tricks_and_scores(
        n in 3usize..=4,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 64),
    ) {
        let seating = seats(n);
        let mut state = GameState::new(seating);
        let mut i = 0usize;
        drive_to_completion(&mut state, |len| {
            let choice = picks[i % picks.len()].index(len);
            i += 1;
            choice
        });
    }
}
