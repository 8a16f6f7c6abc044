//! Per-game state machine: deal, bidding, trick play, scoring, round
//! progression.
//!
//! All mutation goes through `submit_bid`, `play_card`, and
//! `start_next_round`; every error leaves the state untouched. The owning
//! manager serializes calls, so this type needs no internal locking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::cards::{Card, Suit};
use crate::domain::deck::{deal, new_shuffled_deck};
use crate::domain::errors::GameError;
use crate::domain::rules::{first_bidder, forbidden_last_bid, legal_bids, round_fits_deck, seat_after};
use crate::domain::scoring::score_round;
use crate::domain::tricks::trick_winner;
use crate::domain::PlayerId;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    Bidding,
    Playing,
    RoundComplete,
    GameComplete,
}

/// A bid payload; wire form `{"tricks": n}`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub tricks: u8,
}

/// An action a player can take, in the exact wire shape used both for
/// `valid_actions` lists and `PlayerAction` broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    PlayCard(Card),
    Bid(Bid),
}

/// Per-player outcome of a completed round.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerRoundResult {
    pub bid: u8,
    pub tricks_won: u8,
    pub score_delta: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_number: u32,
    pub results: HashMap<PlayerId, PlayerRoundResult>,
}

/// State of the round currently being dealt, bid, or played.
#[derive(Debug, Clone)]
pub struct Round {
    pub cards_per_player: u8,
    pub dealer_index: usize,
    pub first_bidder_index: usize,
    pub trump_suit: Option<Suit>,
    pub hands: HashMap<PlayerId, Vec<Card>>,
    pub bids: HashMap<PlayerId, u8>,
    pub tricks_won: HashMap<PlayerId, u8>,
    pub current_trick: Vec<(PlayerId, Card)>,
    pub lead_suit: Option<Suit>,
    pub tricks_played: u8,
}

/// Domain-level happenings produced by a successful mutation, in order.
/// The session layer translates these into outbound envelopes.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ActionApplied {
        player: PlayerId,
        action: PlayerAction,
        next_player: Option<PlayerId>,
    },
    TrickComplete {
        winner: PlayerId,
    },
    RoundScored {
        result: RoundResult,
    },
    RoundStarted {
        round_number: u32,
    },
    GameComplete {
        final_scores: HashMap<PlayerId, i32>,
    },
}

#[derive(Debug, Clone)]
pub struct GameState {
    /// Seat order, fixed for the lifetime of the game.
    pub seating: Vec<PlayerId>,
    pub phase: Phase,
    pub round_number: u32,
    pub round: Round,
    pub total_scores: HashMap<PlayerId, i32>,
    pub history: Vec<RoundResult>,
    /// Index into `seating` of the player expected to act. After
    /// `RoundComplete` this means "who may start the next round", nothing
    /// more, until the transition fires.
    pub current_index: usize,
}

impl GameState {
    /// Start a game: round 1 deals one card per player, dealer at seat 0.
    pub fn new(seating: Vec<PlayerId>) -> Self {
        debug_assert!((3..=4).contains(&seating.len()));
        let total_scores = seating.iter().map(|p| (*p, 0)).collect();
        let round = Self::deal_round(&seating, 1, 0);
        let current_index = round.first_bidder_index;
        Self {
            seating,
            phase: Phase::Bidding,
            round_number: 1,
            round,
            total_scores,
            history: Vec::new(),
            current_index,
        }
    }

    fn deal_round(seating: &[PlayerId], cards_per_player: u8, dealer_index: usize) -> Round {
        let n = seating.len();
        let deck = new_shuffled_deck();
        let (hands, remainder) = deal(&deck, n, cards_per_player);

        // Left of the dealer gets the first packet of cards.
        let first = first_bidder(dealer_index, n);
        let mut hand_map = HashMap::with_capacity(n);
        for (offset, hand) in hands.into_iter().enumerate() {
            let seat = seat_after(first, offset, n);
            hand_map.insert(seating[seat], hand);
        }

        // The cut card under the dealt packets fixes trump; a deal that
        // consumes the whole deck has no trump.
        let trump_suit = remainder.first().map(|c| c.suit);

        Round {
            cards_per_player,
            dealer_index,
            first_bidder_index: first,
            trump_suit,
            hands: hand_map,
            bids: HashMap::with_capacity(n),
            tricks_won: seating.iter().map(|p| (*p, 0)).collect(),
            current_trick: Vec::with_capacity(n),
            lead_suit: None,
            tricks_played: 0,
        }
    }

    pub fn players(&self) -> usize {
        self.seating.len()
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        match self.phase {
            Phase::GameComplete => None,
            _ => Some(self.seating[self.current_index]),
        }
    }

    pub fn seat_of(&self, player: PlayerId) -> Option<usize> {
        self.seating.iter().position(|p| *p == player)
    }

    fn require_turn(&self, player: PlayerId) -> Result<usize, GameError> {
        let seat = self.seat_of(player).ok_or(GameError::NotSeated)?;
        if seat != self.current_index {
            return Err(GameError::NotYourTurn);
        }
        Ok(seat)
    }

    /// Whether `seat` is the last bidder of the round (the dealer).
    fn is_last_bidder(&self, seat: usize) -> bool {
        seat == self.round.dealer_index
    }

    fn bids_sum(&self) -> u32 {
        self.round.bids.values().map(|b| *b as u32).sum()
    }

    pub fn submit_bid(
        &mut self,
        player: PlayerId,
        bid: u8,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != Phase::Bidding {
            return Err(GameError::WrongPhase);
        }
        let seat = self.require_turn(player)?;
        if bid > self.round.cards_per_player {
            return Err(GameError::InvalidBid);
        }
        if self.is_last_bidder(seat)
            && forbidden_last_bid(self.round.cards_per_player, self.bids_sum()) == Some(bid)
        {
            return Err(GameError::InvalidBid);
        }

        self.round.bids.insert(player, bid);

        let n = self.players();
        if self.round.bids.len() == n {
            // Dealer bid last; play opens at the first bidder.
            self.phase = Phase::Playing;
            self.current_index = self.round.first_bidder_index;
        } else {
            self.current_index = seat_after(seat, 1, n);
        }

        Ok(vec![GameEvent::ActionApplied {
            player,
            action: PlayerAction::Bid(Bid { tricks: bid }),
            next_player: self.current_player(),
        }])
    }

    pub fn play_card(
        &mut self,
        player: PlayerId,
        card: Card,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != Phase::Playing {
            return Err(GameError::WrongPhase);
        }
        let seat = self.require_turn(player)?;

        let hand = self
            .round
            .hands
            .get(&player)
            .ok_or(GameError::NotSeated)?;
        let pos = hand
            .iter()
            .position(|c| *c == card)
            .ok_or(GameError::IllegalCard)?;
        if let Some(lead) = self.round.lead_suit {
            if card.suit != lead && hand.iter().any(|c| c.suit == lead) {
                return Err(GameError::MustFollowSuit);
            }
        }

        let hand = self.round.hands.get_mut(&player).expect("hand checked above");
        hand.remove(pos);
        if self.round.current_trick.is_empty() {
            self.round.lead_suit = Some(card.suit);
        }
        self.round.current_trick.push((player, card));

        let n = self.players();
        let mut events = Vec::new();

        if self.round.current_trick.len() == n {
            let lead = self.round.lead_suit.expect("trick has a lead card");
            let winner = trick_winner(&self.round.current_trick, lead, self.round.trump_suit)
                .expect("complete trick has a winner");
            *self.round.tricks_won.entry(winner).or_insert(0) += 1;
            self.round.tricks_played += 1;
            self.round.current_trick.clear();
            self.round.lead_suit = None;
            self.current_index = self.seat_of(winner).expect("winner is seated");

            events.push(GameEvent::ActionApplied {
                player,
                action: PlayerAction::PlayCard(card),
                next_player: Some(winner),
            });
            events.push(GameEvent::TrickComplete { winner });

            if self.round.tricks_played == self.round.cards_per_player {
                events.push(self.score_completed_round());
            }
        } else {
            self.current_index = seat_after(seat, 1, n);
            events.push(GameEvent::ActionApplied {
                player,
                action: PlayerAction::PlayCard(card),
                next_player: self.current_player(),
            });
        }

        Ok(events)
    }

    fn score_completed_round(&mut self) -> GameEvent {
        let mut results = HashMap::with_capacity(self.players());
        for player in &self.seating {
            let bid = self.round.bids.get(player).copied().unwrap_or(0);
            let tricks_won = self.round.tricks_won.get(player).copied().unwrap_or(0);
            let score_delta = score_round(bid, tricks_won);
            *self.total_scores.entry(*player).or_insert(0) += score_delta;
            results.insert(
                *player,
                PlayerRoundResult {
                    bid,
                    tricks_won,
                    score_delta,
                },
            );
        }
        let result = RoundResult {
            round_number: self.round_number,
            results,
        };
        self.history.push(result.clone());
        // The winner of the last trick already holds current_index; from
        // here until start_next_round it names the rendezvous player.
        self.phase = Phase::RoundComplete;
        GameEvent::RoundScored { result }
    }

    /// Advance past a completed round. Only the rendezvous player (winner of
    /// the round's last trick) may call this.
    pub fn start_next_round(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != Phase::RoundComplete {
            return Err(GameError::WrongPhase);
        }
        self.require_turn(player)?;

        let n = self.players();
        let next_k = self.round.cards_per_player + 1;
        if !round_fits_deck(next_k, n) {
            self.phase = Phase::GameComplete;
            return Ok(vec![GameEvent::GameComplete {
                final_scores: self.total_scores.clone(),
            }]);
        }

        let next_dealer = seat_after(self.round.dealer_index, 1, n);
        self.round = Self::deal_round(&self.seating, next_k, next_dealer);
        self.round_number += 1;
        self.phase = Phase::Bidding;
        self.current_index = self.round.first_bidder_index;

        Ok(vec![GameEvent::RoundStarted {
            round_number: self.round_number,
        }])
    }

    /// Dispatch a wire-shaped action through the matching operation.
    pub fn apply(
        &mut self,
        player: PlayerId,
        action: PlayerAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        match action {
            PlayerAction::Bid(bid) => self.submit_bid(player, bid.tricks),
            PlayerAction::PlayCard(card) => self.play_card(player, card),
        }
    }

    /// Legal actions for `player` right now. Empty for anyone who is not the
    /// current player and for the RoundComplete/GameComplete phases.
    pub fn valid_actions(&self, player: PlayerId) -> Vec<PlayerAction> {
        if self.current_player() != Some(player) {
            return Vec::new();
        }
        match self.phase {
            Phase::Bidding => {
                let seat = self.current_index;
                legal_bids(
                    self.round.cards_per_player,
                    self.bids_sum(),
                    self.is_last_bidder(seat),
                )
                .into_iter()
                .map(|tricks| PlayerAction::Bid(Bid { tricks }))
                .collect()
            }
            Phase::Playing => self
                .legal_cards(player)
                .into_iter()
                .map(PlayerAction::PlayCard)
                .collect(),
            Phase::RoundComplete | Phase::GameComplete => Vec::new(),
        }
    }

    fn legal_cards(&self, player: PlayerId) -> Vec<Card> {
        let Some(hand) = self.round.hands.get(&player) else {
            return Vec::new();
        };
        if let Some(lead) = self.round.lead_suit {
            if hand.iter().any(|c| c.suit == lead) {
                return hand.iter().copied().filter(|c| c.suit == lead).collect();
            }
        }
        hand.clone()
    }

    /// The deterministic default action taken when the current player's turn
    /// deadline fires. Bidding: 0 when legal, otherwise 1. Playing: the
    /// lowest-rank legal card, suits breaking ties Clubs < Diamonds <
    /// Hearts < Spades. None outside Bidding/Playing.
    pub fn auto_action(&self) -> Option<PlayerAction> {
        let player = self.current_player()?;
        match self.phase {
            Phase::Bidding => {
                let legal: Vec<u8> = self
                    .valid_actions(player)
                    .iter()
                    .filter_map(|a| match a {
                        PlayerAction::Bid(b) => Some(b.tricks),
                        _ => None,
                    })
                    .collect();
                let tricks = if legal.contains(&0) { 0 } else { 1 };
                Some(PlayerAction::Bid(Bid { tricks }))
            }
            Phase::Playing => self
                .legal_cards(player)
                .into_iter()
                .min_by_key(|c| (c.rank, c.suit))
                .map(PlayerAction::PlayCard),
            Phase::RoundComplete | Phase::GameComplete => None,
        }
    }
}
