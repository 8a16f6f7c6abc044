//! Shared helpers for domain tests.

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::cards::{Card, Suit};
use crate::domain::rules::first_bidder;
use crate::domain::state::{GameState, Phase, PlayerAction, Round};
use crate::domain::PlayerId;

pub fn seats(n: usize) -> Vec<PlayerId> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

/// Build a game in Bidding with a hand-picked round, bypassing the shuffle.
pub fn fixed_round(
    seating: Vec<PlayerId>,
    cards_per_player: u8,
    dealer_index: usize,
    hands: Vec<Vec<Card>>,
    trump_suit: Option<Suit>,
) -> GameState {
    let n = seating.len();
    assert_eq!(hands.len(), n);
    let first = first_bidder(dealer_index, n);
    let hand_map: HashMap<PlayerId, Vec<Card>> = seating
        .iter()
        .copied()
        .zip(hands)
        .collect();
    GameState {
        seating: seating.clone(),
        phase: Phase::Bidding,
        round_number: 1,
        round: Round {
            cards_per_player,
            dealer_index,
            first_bidder_index: first,
            trump_suit,
            hands: hand_map,
            bids: HashMap::new(),
            tricks_won: seating.iter().map(|p| (*p, 0)).collect(),
            current_trick: Vec::new(),
            lead_suit: None,
            tricks_played: 0,
        },
        total_scores: seating.iter().map(|p| (*p, 0)).collect(),
        history: Vec::new(),
        current_index: first,
    }
}

/// Drive a game to completion, choosing among valid actions with `pick`
/// (given the number of options, returns the chosen index). Asserts the
/// round invariants at every round boundary.
pub fn drive_to_completion(state: &mut GameState, mut pick: impl FnMut(usize) -> usize) {
    let mut guard = 0usize;
    while state.phase != Phase::GameComplete {
        guard += 1;
        assert!(guard < 10_000, "game failed to terminate");

        match state.phase {
            Phase::Bidding | Phase::Playing => {
                let player = state.current_player().expect("someone must act");
                let actions = state.valid_actions(player);
                assert!(!actions.is_empty(), "current player has no legal action");
                let action = actions[pick(actions.len()) % actions.len()];
                state.apply(player, action).expect("picked action is legal");
            }
            Phase::RoundComplete => {
                assert_round_invariants(state);
                let player = state.current_player().expect("rendezvous player");
                state.start_next_round(player).expect("rendezvous may advance");
            }
            Phase::GameComplete => unreachable!(),
        }
    }
    assert_total_score_invariant(state);
}

pub fn assert_round_invariants(state: &GameState) {
    let k = state.round.cards_per_player as u32;
    let tricks: u32 = state.round.tricks_won.values().map(|t| *t as u32).sum();
    assert_eq!(tricks, k, "tricks won must sum to cards per player");

    let bids: u32 = state.round.bids.values().map(|b| *b as u32).sum();
    assert_ne!(bids, k, "bid sum may never equal cards per player");
}

pub fn assert_total_score_invariant(state: &GameState) {
    for player in &state.seating {
        let from_history: i32 = state
            .history
            .iter()
            .filter_map(|r| r.results.get(player))
            .map(|r| r.score_delta)
            .sum();
        assert_eq!(state.total_scores[player], from_history);
    }
}

/// Convenience: apply the scheduler's default action for the current player.
pub fn apply_auto(state: &mut GameState) {
    match state.phase {
        Phase::RoundComplete => {
            let player = state.current_player().unwrap();
            state.start_next_round(player).unwrap();
        }
        _ => {
            let player = state.current_player().unwrap();
            let action = state.auto_action().unwrap();
            state.apply(player, action).unwrap();
        }
    }
}

pub fn bid_of(action: &PlayerAction) -> Option<u8> {
    match action {
        PlayerAction::Bid(b) => Some(b.tricks),
        _ => None,
    }
}
