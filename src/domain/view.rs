//! Per-player snapshots of game state.
//!
//! A view is built under the game lock and serialized outside it. Only the
//! viewer's own hand is ever included.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::cards::{Card, Suit};
use crate::domain::state::{GameState, Phase, RoundResult};
use crate::domain::PlayerId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateView {
    pub game_id: uuid::Uuid,
    pub phase: Phase,
    pub your_hand: Vec<Card>,
    pub current_trick: Vec<(PlayerId, Card)>,
    pub scores: HashMap<PlayerId, i32>,
    pub history: Vec<RoundResult>,
    pub round_number: u32,
    pub trump_suit: Option<Suit>,
    pub current_player: Option<PlayerId>,
    pub your_turn: bool,
}

/// Snapshot the game as seen by `viewer`.
pub fn player_view(state: &GameState, viewer: PlayerId, game_id: uuid::Uuid) -> GameStateView {
    GameStateView {
        game_id,
        phase: state.phase,
        your_hand: state
            .round
            .hands
            .get(&viewer)
            .cloned()
            .unwrap_or_default(),
        current_trick: state.round.current_trick.clone(),
        scores: state.total_scores.clone(),
        history: state.history.clone(),
        round_number: state.round_number,
        trump_suit: state.round.trump_suit,
        current_player: state.current_player(),
        your_turn: state.current_player() == Some(viewer),
    }
}
