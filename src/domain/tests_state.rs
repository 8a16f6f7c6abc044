use crate::domain::cards::{Card, Rank, Suit};
use crate::domain::errors::GameError;
use crate::domain::scoring::score_round;
use crate::domain::state::{Bid, GameEvent, GameState, Phase, PlayerAction};
use crate::domain::test_support::{
    apply_auto, assert_round_invariants, bid_of, drive_to_completion, fixed_round, seats,
};

#[test]
fn first_round_deals_one_card_each() {
    let seating = seats(4);
    let state = GameState::new(seating.clone());
    assert_eq!(state.phase, Phase::Bidding);
    assert_eq!(state.round_number, 1);
    assert_eq!(state.round.cards_per_player, 1);
    assert_eq!(state.round.dealer_index, 0);
    for player in &seating {
        assert_eq!(state.round.hands[player].len(), 1);
    }
    // One card each to four players leaves a cut card, so trump is set.
    assert!(state.round.trump_suit.is_some());
    // Bidding opens left of the dealer.
    assert_eq!(state.current_player(), Some(seating[1]));
}

#[test]
fn bidding_rotates_clockwise_from_left_of_dealer() {
    let seating = seats(3);
    let mut state = GameState::new(seating.clone());
    assert_eq!(state.current_player(), Some(seating[1]));
    state.submit_bid(seating[1], 0).unwrap();
    assert_eq!(state.current_player(), Some(seating[2]));
    state.submit_bid(seating[2], 0).unwrap();
    // Dealer (seat 0) bids last.
    assert_eq!(state.current_player(), Some(seating[0]));
}

#[test]
fn bid_out_of_turn_is_rejected() {
    let seating = seats(4);
    let mut state = GameState::new(seating.clone());
    assert_eq!(
        state.submit_bid(seating[2], 0),
        Err(GameError::NotYourTurn)
    );
}

#[test]
fn bid_above_hand_size_is_rejected() {
    let seating = seats(4);
    let mut state = GameState::new(seating.clone());
    assert_eq!(state.submit_bid(seating[1], 2), Err(GameError::InvalidBid));
}

#[test]
fn play_during_bidding_is_wrong_phase() {
    let seating = seats(4);
    let mut state = GameState::new(seating.clone());
    let card = state.round.hands[&seating[1]][0];
    assert_eq!(
        state.play_card(seating[1], card),
        Err(GameError::WrongPhase)
    );
}

#[test]
fn last_bidder_cannot_complete_the_sum() {
    // k=3, three players, dealer at seat 0; seats 1 and 2 bid 1 each.
    let seating = seats(3);
    let hands = vec![
        vec![
            Card::new(Suit::Clubs, Rank::Two),
            Card::new(Suit::Clubs, Rank::Five),
            Card::new(Suit::Clubs, Rank::Nine),
        ],
        vec![
            Card::new(Suit::Diamonds, Rank::Three),
            Card::new(Suit::Diamonds, Rank::Seven),
            Card::new(Suit::Diamonds, Rank::Jack),
        ],
        vec![
            Card::new(Suit::Hearts, Rank::Four),
            Card::new(Suit::Hearts, Rank::Eight),
            Card::new(Suit::Hearts, Rank::Queen),
        ],
    ];
    let mut state = fixed_round(seating.clone(), 3, 0, hands, Some(Suit::Spades));

    state.submit_bid(seating[1], 1).unwrap();
    state.submit_bid(seating[2], 1).unwrap();

    let dealer_bids: Vec<u8> = state
        .valid_actions(seating[0])
        .iter()
        .filter_map(bid_of)
        .collect();
    assert_eq!(dealer_bids, vec![0, 2, 3]);

    assert_eq!(state.submit_bid(seating[0], 1), Err(GameError::InvalidBid));
    // The rejection left bidding untouched.
    assert_eq!(state.phase, Phase::Bidding);
    assert_eq!(state.current_player(), Some(seating[0]));

    state.submit_bid(seating[0], 2).unwrap();
    assert_eq!(state.phase, Phase::Playing);
    assert_eq!(state.current_player(), Some(seating[1]));
}

#[test]
fn follow_suit_is_enforced() {
    // Seat 2 holds a heart and must follow the heart lead with it.
    let seating = seats(3);
    let hands = vec![
        vec![Card::new(Suit::Clubs, Rank::Nine)],
        vec![Card::new(Suit::Hearts, Rank::Five)],
        vec![Card::new(Suit::Hearts, Rank::Two)],
    ];
    let mut state = fixed_round(seating.clone(), 1, 0, hands, None);
    state.submit_bid(seating[1], 0).unwrap();
    state.submit_bid(seating[2], 0).unwrap();
    state.submit_bid(seating[0], 0).unwrap();

    state
        .play_card(seating[1], Card::new(Suit::Hearts, Rank::Five))
        .unwrap();

    let legal = state.valid_actions(seating[2]);
    assert_eq!(
        legal,
        vec![PlayerAction::PlayCard(Card::new(Suit::Hearts, Rank::Two))]
    );
}

#[test]
fn off_suit_play_with_suit_in_hand_is_rejected() {
    let seating = seats(3);
    let hands = vec![
        vec![Card::new(Suit::Clubs, Rank::Nine), Card::new(Suit::Clubs, Rank::Ten)],
        vec![Card::new(Suit::Hearts, Rank::Five), Card::new(Suit::Diamonds, Rank::Six)],
        vec![Card::new(Suit::Hearts, Rank::Two), Card::new(Suit::Spades, Rank::Ace)],
    ];
    let mut state = fixed_round(seating.clone(), 2, 0, hands, None);
    state.submit_bid(seating[1], 0).unwrap();
    state.submit_bid(seating[2], 0).unwrap();
    state.submit_bid(seating[0], 1).unwrap();

    state
        .play_card(seating[1], Card::new(Suit::Hearts, Rank::Five))
        .unwrap();

    let err = state
        .play_card(seating[2], Card::new(Suit::Spades, Rank::Ace))
        .unwrap_err();
    assert_eq!(err, GameError::MustFollowSuit);
    assert_eq!(err.to_string(), "Must follow suit");
    // Hand unchanged after the rejection.
    assert_eq!(state.round.hands[&seating[2]].len(), 2);
}

#[test]
fn trump_takes_the_trick_and_the_lead() {
    // trump=Diamonds, lead=Hearts; plays K\u{2665} A\u{2665} 2\u{2666} A\u{2663} -> seat 3 wins.
    let seating = seats(4);
    let hands = vec![
        vec![Card::new(Suit::Clubs, Rank::Ace)],
        vec![Card::new(Suit::Hearts, Rank::King)],
        vec![Card::new(Suit::Hearts, Rank::Ace)],
        vec![Card::new(Suit::Diamonds, Rank::Two)],
    ];
    let mut state = fixed_round(seating.clone(), 1, 0, hands, Some(Suit::Diamonds));
    state.submit_bid(seating[1], 0).unwrap();
    state.submit_bid(seating[2], 0).unwrap();
    state.submit_bid(seating[3], 0).unwrap();
    state.submit_bid(seating[0], 0).unwrap();

    state
        .play_card(seating[1], Card::new(Suit::Hearts, Rank::King))
        .unwrap();
    state
        .play_card(seating[2], Card::new(Suit::Hearts, Rank::Ace))
        .unwrap();
    state
        .play_card(seating[3], Card::new(Suit::Diamonds, Rank::Two))
        .unwrap();
    let events = state
        .play_card(seating[0], Card::new(Suit::Clubs, Rank::Ace))
        .unwrap();

    let winner = events.iter().find_map(|e| match e {
        GameEvent::TrickComplete { winner } => Some(*winner),
        _ => None,
    });
    assert_eq!(winner, Some(seating[3]));
    assert_eq!(state.phase, Phase::RoundComplete);
    assert_eq!(state.current_player(), Some(seating[3]));
}

#[test]
fn scoring_matches_bid_outcomes() {
    // k=4 round: bids {2,1,0,2}, tricks {2,0,0,2}.
    assert_eq!(score_round(2, 2), 14);
    assert_eq!(score_round(1, 0), -1);
    assert_eq!(score_round(0, 0), 10);
    assert_eq!(score_round(2, 2), 14);
}

#[test]
fn round_complete_rendezvous_is_exclusive() {
    let seating = seats(3);
    let hands = vec![
        vec![Card::new(Suit::Clubs, Rank::Nine)],
        vec![Card::new(Suit::Hearts, Rank::Five)],
        vec![Card::new(Suit::Hearts, Rank::Two)],
    ];
    let mut state = fixed_round(seating.clone(), 1, 0, hands, None);
    for seat in [1, 2, 0] {
        let player = seating[seat];
        let bid = *state
            .valid_actions(player)
            .iter()
            .filter_map(bid_of)
            .collect::<Vec<_>>()
            .first()
            .unwrap();
        state.submit_bid(player, bid).unwrap();
    }
    while state.phase == Phase::Playing {
        apply_auto(&mut state);
    }
    assert_eq!(state.phase, Phase::RoundComplete);

    let rendezvous = state.current_player().unwrap();
    let other = *seating.iter().find(|p| **p != rendezvous).unwrap();
    assert_eq!(
        state.start_next_round(other),
        Err(GameError::NotYourTurn)
    );
    state.start_next_round(rendezvous).unwrap();
    assert_eq!(state.phase, Phase::Bidding);
    assert_eq!(state.round.cards_per_player, 2);
    assert_eq!(state.round.dealer_index, 1);
    assert_eq!(state.round_number, 2);
}

#[test]
fn valid_actions_empty_for_bystanders_and_parked_phases() {
    let seating = seats(4);
    let state = GameState::new(seating.clone());
    assert!(state.valid_actions(seating[0]).is_empty());
    assert!(!state.valid_actions(seating[1]).is_empty());
}

#[test]
fn auto_bid_prefers_zero_then_one() {
    let seating = seats(3);
    let hands = vec![
        vec![Card::new(Suit::Clubs, Rank::Nine)],
        vec![Card::new(Suit::Hearts, Rank::Five)],
        vec![Card::new(Suit::Hearts, Rank::Two)],
    ];
    let mut state = fixed_round(seating.clone(), 1, 0, hands, None);
    assert_eq!(
        state.auto_action(),
        Some(PlayerAction::Bid(Bid { tricks: 0 }))
    );
    state.submit_bid(seating[1], 1).unwrap();
    state.submit_bid(seating[2], 0).unwrap();
    // Dealer's forbidden value is 0 (sum is already 1 == k), so auto bids 1.
    assert_eq!(
        state.auto_action(),
        Some(PlayerAction::Bid(Bid { tricks: 1 }))
    );
}

#[test]
fn auto_play_picks_lowest_rank_with_suit_tiebreak() {
    let seating = seats(3);
    let hands = vec![
        vec![Card::new(Suit::Clubs, Rank::Nine), Card::new(Suit::Clubs, Rank::Ten)],
        vec![
            Card::new(Suit::Hearts, Rank::Two),
            Card::new(Suit::Clubs, Rank::Two),
            // Same rank as the club two: clubs win the tiebreak.
        ],
        vec![Card::new(Suit::Hearts, Rank::Five), Card::new(Suit::Diamonds, Rank::Six)],
    ];
    let mut state = fixed_round(seating.clone(), 2, 0, hands, None);
    state.submit_bid(seating[1], 0).unwrap();
    state.submit_bid(seating[2], 0).unwrap();
    state.submit_bid(seating[0], 1).unwrap();

    assert_eq!(
        state.auto_action(),
        Some(PlayerAction::PlayCard(Card::new(Suit::Clubs, Rank::Two)))
    );
}

#[test]
fn three_player_game_terminates_after_seventeen_rounds() {
    let seating = seats(3);
    let mut state = GameState::new(seating.clone());
    while state.phase != Phase::GameComplete {
        apply_auto(&mut state);
    }
    assert_eq!(state.history.len(), 17);
    assert_eq!(state.history.last().unwrap().round_number, 17);
    assert_eq!(state.current_player(), None);
}

#[test]
fn four_player_game_terminates_after_thirteen_rounds() {
    let seating = seats(4);
    let mut state = GameState::new(seating.clone());
    while state.phase != Phase::GameComplete {
        if state.phase == Phase::RoundComplete {
            assert_round_invariants(&state);
        }
        apply_auto(&mut state);
    }
    assert_eq!(state.history.len(), 13);
    // Round 13 deals the entire deck, so it has no trump cut card.
    // (Verified indirectly: 13 * 4 == 52.)
    assert_eq!(state.history.last().unwrap().round_number, 13);
}

#[test]
fn final_round_with_full_deck_has_no_trump() {
    let seating = seats(4);
    let mut state = GameState::new(seating.clone());
    while state.round_number < 13 {
        apply_auto(&mut state);
    }
    assert_eq!(state.round.cards_per_player, 13);
    assert_eq!(state.round.trump_suit, None);
}

#[test]
fn random_walk_games_preserve_invariants() {
    let mut tick = 7usize;
    for n in [3usize, 4] {
        let seating = seats(n);
        let mut state = GameState::new(seating);
        drive_to_completion(&mut state, |len| {
            tick = tick.wrapping_mul(31).wrapping_add(17);
            tick % len
        });
    }
}

#[test]
fn actions_after_game_complete_are_rejected() {
    let seating = seats(4);
    let mut state = GameState::new(seating.clone());
    while state.phase != Phase::GameComplete {
        apply_auto(&mut state);
    }
    assert_eq!(state.submit_bid(seating[0], 0), Err(GameError::WrongPhase));
    assert_eq!(
        state.start_next_round(seating[0]),
        Err(GameError::WrongPhase)
    );
    assert!(state.auto_action().is_none());
}
