//! Game registry, action funnel, and the turn scheduler.
//!
//! Every mutation of a game happens under its dashmap entry lock, and every
//! outbound envelope for that game is enqueued while the lock is held, so
//! each recipient observes one linear history. Turn deadlines carry a
//! generation counter: a fire whose generation is stale is a no-op, which is
//! how player actions cancel pending timers without racing them.

use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::state::{GameEvent, GameState, PlayerAction};
use crate::domain::view::player_view;
use crate::domain::{GameError, Phase, PlayerId};
use crate::services::connections::ConnectionManager;
use crate::store::archive::GameArchive;
use crate::ws::protocol::{LobbySettings, ServerMessage};

pub type GameId = Uuid;

/// How long a finished game lingers to serve trailing state requests.
const COMPLETED_RETENTION: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum GameServiceError {
    #[error("Game not found")]
    GameNotFound,

    #[error(transparent)]
    Rule(#[from] GameError),
}

pub struct Game {
    pub id: GameId,
    pub state: GameState,
    pub settings: LobbySettings,
    timer_gen: u64,
    completed: bool,
}

enum Move {
    Act(PlayerAction),
    NextRound,
}

pub struct GameManager {
    games: DashMap<GameId, Game>,
    archive: Arc<dyn GameArchive>,
    /// Weak handle to ourselves so timer tasks can reach back in.
    self_ref: OnceLock<Weak<GameManager>>,
}

impl GameManager {
    pub fn new(archive: Arc<dyn GameArchive>) -> Arc<Self> {
        let manager = Arc::new(Self {
            games: DashMap::new(),
            archive,
            self_ref: OnceLock::new(),
        });
        let _ = manager.self_ref.set(Arc::downgrade(&manager));
        manager
    }

    fn shared(&self) -> Option<Arc<Self>> {
        self.self_ref.get()?.upgrade()
    }

    fn reconnect_grace(settings: &LobbySettings) -> Duration {
        if settings.allow_reconnect {
            Duration::from_secs(settings.turn_timeout_secs * 4)
        } else {
            Duration::ZERO
        }
    }

    /// Seat a lobby's players, deal round one, and announce the game.
    pub fn create(
        &self,
        conns: &Arc<ConnectionManager>,
        seating: Vec<PlayerId>,
        settings: LobbySettings,
    ) -> GameId {
        let game_id = Uuid::new_v4();
        let grace = Self::reconnect_grace(&settings);
        for player in &seating {
            conns.enter_game(*player, game_id, grace);
        }

        let game = Game {
            id: game_id,
            state: GameState::new(seating.clone()),
            settings,
            timer_gen: 0,
            completed: false,
        };
        self.games.insert(game_id, game);
        info!(game_id = %game_id, players = seating.len(), "game created");

        let mut entry = self.games.get_mut(&game_id).expect("just inserted");
        let game = entry.value_mut();
        conns.broadcast(&seating, &ServerMessage::GameStarting { game_id });
        self.push_state_views(conns, game);
        self.after_transition(conns, game);
        game_id
    }

    pub fn handle_action(
        &self,
        conns: &Arc<ConnectionManager>,
        game_id: GameId,
        player: PlayerId,
        action: PlayerAction,
    ) -> Result<(), GameServiceError> {
        self.apply(conns, game_id, player, Move::Act(action))
    }

    pub fn start_next_round(
        &self,
        conns: &Arc<ConnectionManager>,
        game_id: GameId,
        player: PlayerId,
    ) -> Result<(), GameServiceError> {
        self.apply(conns, game_id, player, Move::NextRound)
    }

    fn apply(
        &self,
        conns: &Arc<ConnectionManager>,
        game_id: GameId,
        player: PlayerId,
        mv: Move,
    ) -> Result<(), GameServiceError> {
        let mut entry = self
            .games
            .get_mut(&game_id)
            .ok_or(GameServiceError::GameNotFound)?;
        let game = entry.value_mut();
        let events = match mv {
            Move::Act(action) => game.state.apply(player, action)?,
            Move::NextRound => game.state.start_next_round(player)?,
        };
        self.dispatch(conns, game, &events);
        self.after_transition(conns, game);
        Ok(())
    }

    /// Send a fresh state snapshot to one seated player.
    pub fn request_state(
        &self,
        conns: &Arc<ConnectionManager>,
        game_id: GameId,
        player: PlayerId,
    ) -> Result<(), GameServiceError> {
        let entry = self
            .games
            .get(&game_id)
            .ok_or(GameServiceError::GameNotFound)?;
        let game = entry.value();
        if game.state.seat_of(player).is_none() {
            return Err(GameError::NotSeated.into());
        }
        conns.send(
            player,
            ServerMessage::GameState {
                state: player_view(&game.state, player, game.id),
            },
        );
        Ok(())
    }

    /// Reconnection synthesis: current truth to the returning player, a
    /// notification to everyone else. The pending turn deadline is left
    /// untouched.
    pub fn resume(
        &self,
        conns: &Arc<ConnectionManager>,
        game_id: GameId,
        player: PlayerId,
    ) -> Result<(), GameServiceError> {
        let entry = self
            .games
            .get(&game_id)
            .ok_or(GameServiceError::GameNotFound)?;
        let game = entry.value();
        if game.state.seat_of(player).is_none() {
            return Err(GameError::NotSeated.into());
        }
        for other in &game.state.seating {
            if *other != player {
                conns.send(*other, ServerMessage::PlayerReconnected { player_id: player });
            }
        }
        conns.send(
            player,
            ServerMessage::GameState {
                state: player_view(&game.state, player, game.id),
            },
        );
        if game.state.current_player() == Some(player) {
            conns.send(
                player,
                ServerMessage::YourTurn {
                    valid_actions: game.state.valid_actions(player),
                },
            );
        }
        Ok(())
    }

    /// A session died for good; its seat stays and keeps auto-playing.
    pub fn handle_expired_session(
        &self,
        conns: &Arc<ConnectionManager>,
        game_id: GameId,
        player: PlayerId,
    ) {
        let Some(entry) = self.games.get(&game_id) else {
            return;
        };
        for other in &entry.state.seating {
            if *other != player {
                conns.send(*other, ServerMessage::PlayerLeft { player_id: player });
            }
        }
    }

    pub fn active_games(&self) -> usize {
        self.games.iter().filter(|entry| !entry.completed).count()
    }

    fn dispatch(&self, conns: &Arc<ConnectionManager>, game: &mut Game, events: &[GameEvent]) {
        let seating = game.state.seating.clone();
        for event in events {
            match event {
                GameEvent::ActionApplied {
                    player,
                    action,
                    next_player,
                } => {
                    conns.broadcast(
                        &seating,
                        &ServerMessage::PlayerAction {
                            player_id: *player,
                            action: *action,
                            next_player: *next_player,
                        },
                    );
                }
                GameEvent::TrickComplete { winner } => {
                    debug!(game_id = %game.id, winner = %winner, "trick complete");
                    conns.broadcast(&seating, &ServerMessage::TrickComplete { winner: *winner });
                }
                GameEvent::RoundScored { result } => {
                    info!(
                        game_id = %game.id,
                        round = result.round_number,
                        "round scored"
                    );
                    self.push_state_views(conns, game);
                }
                GameEvent::RoundStarted { round_number } => {
                    info!(game_id = %game.id, round = round_number, "round started");
                    self.push_state_views(conns, game);
                }
                GameEvent::GameComplete { final_scores } => {
                    info!(game_id = %game.id, "game complete");
                    game.completed = true;
                    conns.broadcast(
                        &seating,
                        &ServerMessage::GameOver {
                            final_scores: final_scores.clone(),
                        },
                    );
                    self.archive.game_completed(game.id, final_scores);
                }
            }
        }
    }

    /// Arm or disarm the turn deadline after any successful transition, and
    /// tell the player to act when the phase calls for one.
    fn after_transition(&self, conns: &Arc<ConnectionManager>, game: &mut Game) {
        match game.state.phase {
            Phase::Bidding | Phase::Playing => {
                let player = game.state.current_player().expect("phase has an actor");
                conns.send(
                    player,
                    ServerMessage::YourTurn {
                        valid_actions: game.state.valid_actions(player),
                    },
                );
                self.arm_deadline(conns, game);
            }
            Phase::RoundComplete => {
                // The rendezvous player has no broadcast action list; the
                // deadline still runs so a parked game advances itself.
                self.arm_deadline(conns, game);
            }
            Phase::GameComplete => {
                game.timer_gen += 1;
                self.schedule_removal(conns, game);
            }
        }
    }

    fn arm_deadline(&self, conns: &Arc<ConnectionManager>, game: &mut Game) {
        game.timer_gen += 1;
        let gen = game.timer_gen;
        let game_id = game.id;
        let timeout = Duration::from_secs(game.settings.turn_timeout_secs);
        let Some(manager) = self.shared() else {
            return;
        };
        let conns = Arc::clone(conns);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            manager.on_deadline(&conns, game_id, gen);
        });
    }

    fn on_deadline(&self, conns: &Arc<ConnectionManager>, game_id: GameId, gen: u64) {
        let Some(mut entry) = self.games.get_mut(&game_id) else {
            return;
        };
        let game = entry.value_mut();
        if game.timer_gen != gen || game.completed {
            return;
        }
        let Some(player) = game.state.current_player() else {
            return;
        };

        let result = match game.state.phase {
            Phase::Bidding | Phase::Playing => {
                let Some(action) = game.state.auto_action() else {
                    return;
                };
                info!(
                    game_id = %game_id,
                    player = %player,
                    "turn deadline fired; auto-playing"
                );
                game.state.apply(player, action)
            }
            Phase::RoundComplete => {
                info!(
                    game_id = %game_id,
                    player = %player,
                    "round rendezvous deadline fired; starting next round"
                );
                game.state.start_next_round(player)
            }
            Phase::GameComplete => return,
        };

        match result {
            Ok(events) => {
                self.dispatch(conns, game, &events);
                self.after_transition(conns, game);
            }
            Err(err) => {
                warn!(game_id = %game_id, error = %err, "auto action rejected");
            }
        }
    }

    fn push_state_views(&self, conns: &Arc<ConnectionManager>, game: &Game) {
        for player in &game.state.seating {
            conns.send(
                *player,
                ServerMessage::GameState {
                    state: player_view(&game.state, *player, game.id),
                },
            );
        }
    }

    fn schedule_removal(&self, conns: &Arc<ConnectionManager>, game: &Game) {
        let game_id = game.id;
        let seating = game.state.seating.clone();
        let Some(manager) = self.shared() else {
            return;
        };
        let conns = Arc::clone(conns);
        tokio::spawn(async move {
            tokio::time::sleep(COMPLETED_RETENTION).await;
            if manager.games.remove(&game_id).is_some() {
                for player in seating {
                    conns.clear_game(player);
                }
                debug!(game_id = %game_id, "completed game dropped");
            }
        });
    }

}
