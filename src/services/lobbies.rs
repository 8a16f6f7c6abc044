//! Lobby lifecycle: create, join, leave, list, start.
//!
//! Mutations happen under the lobby's dashmap entry lock. The lobby → game
//! handoff drops the lobby guard before the game is created, so lobby and
//! game locks are never held together (lobby strictly before game).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domain::PlayerId;
use crate::services::connections::ConnectionManager;
use crate::services::games::GameManager;
use crate::store::archive::GameArchive;
use crate::ws::protocol::{LobbySettings, LobbySummary, PlayerInfo, ServerMessage};

pub type LobbyId = Uuid;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LobbyStatus {
    Open,
    Starting,
    Closed,
}

pub struct Lobby {
    pub id: LobbyId,
    pub host: PlayerId,
    pub players: Vec<PlayerInfo>,
    pub settings: LobbySettings,
    pub status: LobbyStatus,
}

impl Lobby {
    fn max_players(&self) -> usize {
        self.settings.player_count.seats()
    }

    fn summary(&self) -> LobbySummary {
        LobbySummary {
            id: self.id,
            host: self.host,
            players: self.players.clone(),
            max_players: self.max_players(),
            settings: self.settings,
        }
    }

    fn member_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.player_id).collect()
    }

    /// Reconnect grace for members: the turn timeout times four, or nothing
    /// at all when reconnects are disabled.
    fn reconnect_grace(&self) -> Duration {
        if self.settings.allow_reconnect {
            Duration::from_secs(self.settings.turn_timeout_secs * 4)
        } else {
            Duration::ZERO
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum LobbyError {
    #[error("Lobby not found")]
    LobbyNotFound,

    #[error("Lobby is full")]
    LobbyFull,

    #[error("Lobby is closed")]
    LobbyClosed,

    #[error("Already in a lobby or game")]
    AlreadyJoined,

    #[error("Only the host can start the game")]
    NotHost,

    #[error("Not enough players to start")]
    NotEnoughPlayers,
}

pub struct LobbyManager {
    lobbies: DashMap<LobbyId, Lobby>,
    archive: Arc<dyn GameArchive>,
}

impl LobbyManager {
    pub fn new(archive: Arc<dyn GameArchive>) -> Self {
        Self {
            lobbies: DashMap::new(),
            archive,
        }
    }

    pub fn create(
        &self,
        conns: &Arc<ConnectionManager>,
        session_id: PlayerId,
        settings: LobbySettings,
    ) -> Result<LobbyId, LobbyError> {
        let (lobby, game) = conns.context(session_id);
        if lobby.is_some() || game.is_some() {
            return Err(LobbyError::AlreadyJoined);
        }
        let username = conns.username(session_id).unwrap_or_default();

        let lobby_id = Uuid::new_v4();
        let lobby = Lobby {
            id: lobby_id,
            host: session_id,
            players: vec![PlayerInfo {
                player_id: session_id,
                username,
            }],
            settings,
            status: LobbyStatus::Open,
        };
        let grace = lobby.reconnect_grace();
        self.lobbies.insert(lobby_id, lobby);
        conns.set_lobby(session_id, Some(lobby_id), Some(grace));

        info!(lobby_id = %lobby_id, host = %session_id, "lobby created");
        conns.send(session_id, ServerMessage::LobbyCreated { lobby_id });
        Ok(lobby_id)
    }

    pub fn join(
        &self,
        conns: &Arc<ConnectionManager>,
        session_id: PlayerId,
        lobby_id: LobbyId,
    ) -> Result<(), LobbyError> {
        let (current_lobby, current_game) = conns.context(session_id);
        if current_game.is_some() {
            return Err(LobbyError::AlreadyJoined);
        }
        match current_lobby {
            // Rejoining the lobby you are in restates current truth.
            Some(existing) if existing == lobby_id => {
                let entry = self.lobbies.get(&lobby_id).ok_or(LobbyError::LobbyNotFound)?;
                conns.send(
                    session_id,
                    ServerMessage::LobbyJoined {
                        lobby: entry.summary(),
                    },
                );
                return Ok(());
            }
            Some(_) => return Err(LobbyError::AlreadyJoined),
            None => {}
        }

        let mut entry = self
            .lobbies
            .get_mut(&lobby_id)
            .ok_or(LobbyError::LobbyNotFound)?;
        let lobby = entry.value_mut();
        if lobby.status != LobbyStatus::Open {
            return Err(LobbyError::LobbyClosed);
        }
        if lobby.players.len() >= lobby.max_players() {
            return Err(LobbyError::LobbyFull);
        }

        let username = conns.username(session_id).unwrap_or_default();
        lobby.players.push(PlayerInfo {
            player_id: session_id,
            username,
        });
        conns.set_lobby(session_id, Some(lobby_id), Some(lobby.reconnect_grace()));

        let summary = lobby.summary();
        info!(lobby_id = %lobby_id, player = %session_id, "player joined lobby");
        conns.send(
            session_id,
            ServerMessage::LobbyJoined {
                lobby: summary.clone(),
            },
        );
        for other in lobby.member_ids() {
            if other != session_id {
                conns.send(other, ServerMessage::PlayerJoined { player_id: session_id });
                conns.send(
                    other,
                    ServerMessage::LobbyUpdated {
                        lobby: summary.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    pub fn leave(
        &self,
        conns: &Arc<ConnectionManager>,
        session_id: PlayerId,
        lobby_id: LobbyId,
    ) -> Result<(), LobbyError> {
        self.remove_member(conns, session_id, lobby_id)?;
        conns.set_lobby(session_id, None, None);
        Ok(())
    }

    /// Shared removal path for voluntary leaves and expired sessions.
    pub fn remove_member(
        &self,
        conns: &Arc<ConnectionManager>,
        session_id: PlayerId,
        lobby_id: LobbyId,
    ) -> Result<(), LobbyError> {
        let mut entry = self
            .lobbies
            .get_mut(&lobby_id)
            .ok_or(LobbyError::LobbyNotFound)?;
        let lobby = entry.value_mut();
        lobby.players.retain(|p| p.player_id != session_id);

        if lobby.players.is_empty() {
            drop(entry);
            self.lobbies.remove(&lobby_id);
            info!(lobby_id = %lobby_id, "lobby dropped (empty)");
            return Ok(());
        }

        if lobby.host == session_id {
            lobby.host = lobby.players[0].player_id;
            info!(lobby_id = %lobby_id, new_host = %lobby.host, "host reassigned");
        }

        let summary = lobby.summary();
        for other in lobby.member_ids() {
            conns.send(other, ServerMessage::PlayerLeft { player_id: session_id });
            conns.send(
                other,
                ServerMessage::LobbyUpdated {
                    lobby: summary.clone(),
                },
            );
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<LobbySummary> {
        self.lobbies
            .iter()
            .filter(|entry| entry.status == LobbyStatus::Open)
            .map(|entry| entry.summary())
            .collect()
    }

    /// Host-only: close the lobby and hand its seating to the game manager.
    pub fn start(
        &self,
        conns: &Arc<ConnectionManager>,
        games: &Arc<GameManager>,
        session_id: PlayerId,
        lobby_id: LobbyId,
    ) -> Result<Uuid, LobbyError> {
        let (seating, settings, summary) = {
            let mut entry = self
                .lobbies
                .get_mut(&lobby_id)
                .ok_or(LobbyError::LobbyNotFound)?;
            let lobby = entry.value_mut();
            if lobby.status != LobbyStatus::Open {
                return Err(LobbyError::LobbyClosed);
            }
            if lobby.host != session_id {
                return Err(LobbyError::NotHost);
            }
            if lobby.players.len() < lobby.max_players() {
                return Err(LobbyError::NotEnoughPlayers);
            }
            lobby.status = LobbyStatus::Starting;
            (lobby.member_ids(), lobby.settings, lobby.summary())
        };

        // Lobby guard released; game creation takes its own lock.
        let game_id = games.create(conns, seating, settings);
        self.archive.lobby_started(&summary, game_id);

        if let Some(mut entry) = self.lobbies.get_mut(&lobby_id) {
            entry.status = LobbyStatus::Closed;
        }
        self.lobbies.remove(&lobby_id);
        info!(lobby_id = %lobby_id, game_id = %game_id, "lobby closed into game");
        Ok(game_id)
    }

    /// Reconnection synthesis: current lobby truth to the returning member,
    /// a notification to everyone else when the session was Absent.
    pub fn resume(
        &self,
        conns: &Arc<ConnectionManager>,
        session_id: PlayerId,
        lobby_id: LobbyId,
        was_absent: bool,
    ) -> Result<(), LobbyError> {
        let entry = self
            .lobbies
            .get(&lobby_id)
            .ok_or(LobbyError::LobbyNotFound)?;
        let lobby = entry.value();
        conns.send(
            session_id,
            ServerMessage::LobbyJoined {
                lobby: lobby.summary(),
            },
        );
        if was_absent {
            for other in lobby.member_ids() {
                if other != session_id {
                    conns.send(
                        other,
                        ServerMessage::PlayerReconnected {
                            player_id: session_id,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Teardown for a session whose reconnect grace expired.
    pub fn handle_expired_session(
        &self,
        conns: &Arc<ConnectionManager>,
        session_id: PlayerId,
        lobby_id: LobbyId,
    ) {
        let _ = self.remove_member(conns, session_id, lobby_id);
    }
}
