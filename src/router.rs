//! Inbound dispatch and session lifecycle.
//!
//! The router owns nothing itself: it checks the sender's context, invokes
//! the right manager, and funnels every failure back to the sender as an
//! `Error {message}` envelope. Nothing here is ever broadcast.

use std::sync::Arc;

use actix::prelude::Recipient;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::domain::state::PlayerAction;
use crate::domain::PlayerId;
use crate::services::connections::{
    BindOutcome, ConnectionManager, SessionCommand, UserId,
};
use crate::services::games::{GameManager, GameServiceError};
use crate::services::lobbies::{LobbyError, LobbyManager};
use crate::ws::protocol::{ClientMessage, ServerMessage};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Not in a lobby")]
    NotInLobby,

    #[error("Not in a game")]
    NotInGame,

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Game(#[from] GameServiceError),
}

pub struct MessageRouter {
    connections: Arc<ConnectionManager>,
    lobbies: Arc<LobbyManager>,
    games: Arc<GameManager>,
}

impl MessageRouter {
    /// Build the router and wire the connection manager's expiry path into
    /// the lobby/game managers.
    pub fn new(
        connections: Arc<ConnectionManager>,
        lobbies: Arc<LobbyManager>,
        games: Arc<GameManager>,
    ) -> Arc<Self> {
        let weak_conns = Arc::downgrade(&connections);
        let hook_lobbies = Arc::clone(&lobbies);
        let hook_games = Arc::clone(&games);
        connections.install_expiry_hook(Box::new(move |expired| {
            let Some(conns) = weak_conns.upgrade() else {
                return;
            };
            if let Some(lobby_id) = expired.lobby {
                hook_lobbies.handle_expired_session(&conns, expired.session_id, lobby_id);
            }
            if let Some(game_id) = expired.game {
                hook_games.handle_expired_session(&conns, game_id, expired.session_id);
            }
        }));

        Arc::new(Self {
            connections,
            lobbies,
            games,
        })
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn lobbies(&self) -> &Arc<LobbyManager> {
        &self.lobbies
    }

    pub fn games(&self) -> &Arc<GameManager> {
        &self.games
    }

    /// An authenticated socket opened: bind it, greet it, and synthesize
    /// current truth for a returning session.
    pub fn connect(
        &self,
        user_id: UserId,
        username: &str,
        conn_id: Uuid,
        recipient: Recipient<SessionCommand>,
    ) -> PlayerId {
        let outcome = self.connections.bind(user_id, username, conn_id, recipient);
        let session_id = outcome.session_id();
        self.connections.send(
            session_id,
            ServerMessage::Connected {
                player_id: session_id,
            },
        );

        if let BindOutcome::Resumed {
            was_absent,
            lobby,
            game,
            ..
        } = outcome
        {
            if let Some(game_id) = game {
                let result = if was_absent {
                    self.games.resume(&self.connections, game_id, session_id)
                } else {
                    self.games.request_state(&self.connections, game_id, session_id)
                };
                if let Err(err) = result {
                    debug!(session_id = %session_id, error = %err, "stale game on reconnect");
                }
            } else if let Some(lobby_id) = lobby {
                if let Err(err) =
                    self.lobbies
                        .resume(&self.connections, session_id, lobby_id, was_absent)
                {
                    debug!(session_id = %session_id, error = %err, "stale lobby on reconnect");
                }
            }
        }
        session_id
    }

    /// A socket went away; the session lingers for its reconnect grace.
    pub fn disconnect(&self, session_id: PlayerId, conn_id: Uuid) {
        self.connections.mark_absent(session_id, conn_id);
    }

    /// Route one parsed envelope; failures are reported to the sender only.
    pub fn route(&self, session_id: PlayerId, message: ClientMessage) {
        if let Err(err) = self.dispatch(session_id, message) {
            self.connections.send(
                session_id,
                ServerMessage::Error {
                    message: err.to_string(),
                },
            );
        }
    }

    fn dispatch(&self, session_id: PlayerId, message: ClientMessage) -> Result<(), RouterError> {
        self.connections.touch(session_id);
        match message {
            ClientMessage::Ping => {
                self.connections.send(session_id, ServerMessage::Pong);
                Ok(())
            }
            ClientMessage::ListLobbies => {
                self.connections.send(
                    session_id,
                    ServerMessage::LobbyList {
                        lobbies: self.lobbies.list(),
                    },
                );
                Ok(())
            }
            ClientMessage::CreateLobby { settings } => {
                settings.validate().map_err(RouterError::InvalidSettings)?;
                self.lobbies
                    .create(&self.connections, session_id, settings)?;
                Ok(())
            }
            ClientMessage::JoinLobby { lobby_id } => {
                self.lobbies.join(&self.connections, session_id, lobby_id)?;
                Ok(())
            }
            ClientMessage::LeaveLobby => {
                let lobby_id = self.require_lobby(session_id)?;
                self.lobbies.leave(&self.connections, session_id, lobby_id)?;
                Ok(())
            }
            ClientMessage::StartGame => {
                let lobby_id = self.require_lobby(session_id)?;
                self.lobbies
                    .start(&self.connections, &self.games, session_id, lobby_id)?;
                Ok(())
            }
            ClientMessage::PlaceBid { bid } => {
                let game_id = self.require_game(session_id)?;
                self.games.handle_action(
                    &self.connections,
                    game_id,
                    session_id,
                    PlayerAction::Bid(bid),
                )?;
                Ok(())
            }
            ClientMessage::PlayCard { card } => {
                let game_id = self.require_game(session_id)?;
                self.games.handle_action(
                    &self.connections,
                    game_id,
                    session_id,
                    PlayerAction::PlayCard(card),
                )?;
                Ok(())
            }
            ClientMessage::RequestGameState => {
                let game_id = self.require_game(session_id)?;
                self.games
                    .request_state(&self.connections, game_id, session_id)?;
                Ok(())
            }
            ClientMessage::StartNextRound => {
                let game_id = self.require_game(session_id)?;
                self.games
                    .start_next_round(&self.connections, game_id, session_id)?;
                Ok(())
            }
        }
    }

    fn require_lobby(&self, session_id: PlayerId) -> Result<Uuid, RouterError> {
        self.connections
            .context(session_id)
            .0
            .ok_or(RouterError::NotInLobby)
    }

    fn require_game(&self, session_id: PlayerId) -> Result<Uuid, RouterError> {
        self.connections
            .context(session_id)
            .1
            .ok_or(RouterError::NotInGame)
    }
}
