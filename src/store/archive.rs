//! Snapshot hooks for the persistence collaborator.
//!
//! Invoked on lobby → game transitions and on game completion. Failures in
//! an implementation must not block gameplay; in-memory state stays
//! authoritative.

use std::collections::HashMap;

use tracing::info;

use crate::domain::PlayerId;
use crate::services::games::GameId;
use crate::ws::protocol::LobbySummary;

pub trait GameArchive: Send + Sync {
    fn lobby_started(&self, lobby: &LobbySummary, game_id: GameId);
    fn game_completed(&self, game_id: GameId, final_scores: &HashMap<PlayerId, i32>);
}

/// Default archive: record the transition in the log and move on.
pub struct LoggingArchive;

impl GameArchive for LoggingArchive {
    fn lobby_started(&self, lobby: &LobbySummary, game_id: GameId) {
        info!(
            lobby_id = %lobby.id,
            game_id = %game_id,
            players = lobby.players.len(),
            "archived lobby start"
        );
    }

    fn game_completed(&self, game_id: GameId, final_scores: &HashMap<PlayerId, i32>) {
        info!(
            game_id = %game_id,
            players = final_scores.len(),
            "archived game completion"
        );
    }
}
