//! Wire protocol: tagged `{"type": ..., "payload": ...}` envelopes.
//!
//! Exhaustive enums on both directions; the router matches every variant so
//! an unhandled message type cannot slip through compilation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::state::{Bid, PlayerAction};
use crate::domain::view::GameStateView;
use crate::domain::{Card, PlayerId};
use crate::services::games::GameId;
use crate::services::lobbies::LobbyId;

/// Requested table size; `max_players` derives from it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum PlayerCount {
    Three,
    Four,
}

impl PlayerCount {
    pub fn seats(self) -> usize {
        match self {
            PlayerCount::Three => 3,
            PlayerCount::Four => 4,
        }
    }
}

pub const MIN_TURN_TIMEOUT_SECS: u64 = 10;
pub const MAX_TURN_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct LobbySettings {
    pub player_count: PlayerCount,
    pub turn_timeout_secs: u64,
    pub allow_reconnect: bool,
}

impl LobbySettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_TURN_TIMEOUT_SECS..=MAX_TURN_TIMEOUT_SECS).contains(&self.turn_timeout_secs) {
            return Err(format!(
                "turn_timeout_secs must be between {MIN_TURN_TIMEOUT_SECS} and {MAX_TURN_TIMEOUT_SECS}"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub host: PlayerId,
    pub players: Vec<PlayerInfo>,
    pub max_players: usize,
    pub settings: LobbySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    CreateLobby { settings: LobbySettings },
    JoinLobby { lobby_id: LobbyId },
    LeaveLobby,
    StartGame,
    ListLobbies,
    PlaceBid { bid: Bid },
    PlayCard { card: Card },
    RequestGameState,
    StartNextRound,
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    Connected {
        player_id: PlayerId,
    },
    Pong,
    Error {
        message: String,
    },
    LobbyCreated {
        lobby_id: LobbyId,
    },
    LobbyJoined {
        lobby: LobbySummary,
    },
    LobbyUpdated {
        lobby: LobbySummary,
    },
    LobbyList {
        lobbies: Vec<LobbySummary>,
    },
    GameStarting {
        game_id: GameId,
    },
    GameState {
        state: GameStateView,
    },
    YourTurn {
        valid_actions: Vec<PlayerAction>,
    },
    PlayerAction {
        player_id: PlayerId,
        action: PlayerAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_player: Option<PlayerId>,
    },
    TrickComplete {
        winner: PlayerId,
    },
    GameOver {
        final_scores: HashMap<PlayerId, i32>,
    },
    PlayerJoined {
        player_id: PlayerId,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerReconnected {
        player_id: PlayerId,
    },
}
