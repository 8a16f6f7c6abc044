//! Session registry and socket binding.
//!
//! Sessions outlive sockets: the socket is only the session's current output
//! channel. All state here is keyed by session id; `user_id → session_id`
//! gives a reconnecting user their old identity back. Entry references into
//! the dashmaps are the per-session exclusive locks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

use actix::prelude::*;
use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::PlayerId;
use crate::services::games::GameId;
use crate::services::lobbies::LobbyId;
use crate::ws::protocol::ServerMessage;

/// Command delivered to a session's websocket actor. The actor mailbox is
/// the bounded per-session outbound queue; an envelope that does not fit
/// costs the socket its connection.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub enum SessionCommand {
    Deliver(ServerMessage),
    Close,
}

pub type UserId = Uuid;

#[derive(Clone)]
pub enum SocketState {
    Live(Recipient<SessionCommand>),
    Absent { since: Instant },
}

pub struct Session {
    pub id: PlayerId,
    pub user_id: UserId,
    pub username: String,
    pub socket: SocketState,
    /// Identifies the socket currently bound; a stale socket's teardown
    /// must not touch a session that has already rebound.
    pub conn_id: Uuid,
    /// Bumped on every bind/absent transition; grace timers are no-ops when
    /// the epoch has moved on.
    pub epoch: u64,
    pub last_seen: Instant,
    pub lobby: Option<LobbyId>,
    pub game: Option<GameId>,
    /// How long this session survives while Absent. Updated when the
    /// session joins a lobby or game.
    pub reconnect_grace: Duration,
}

/// What the registry reports after binding a socket to a user.
pub enum BindOutcome {
    Created {
        session_id: PlayerId,
    },
    Resumed {
        session_id: PlayerId,
        /// True when the session was Absent (a real reconnect); false when a
        /// newer socket displaced a live one.
        was_absent: bool,
        lobby: Option<LobbyId>,
        game: Option<GameId>,
    },
}

impl BindOutcome {
    pub fn session_id(&self) -> PlayerId {
        match self {
            BindOutcome::Created { session_id } => *session_id,
            BindOutcome::Resumed { session_id, .. } => *session_id,
        }
    }
}

/// A session destroyed after its reconnect grace ran out.
pub struct ExpiredSession {
    pub session_id: PlayerId,
    pub username: String,
    pub lobby: Option<LobbyId>,
    pub game: Option<GameId>,
}

pub type SessionExpiredHook = Box<dyn Fn(ExpiredSession) + Send + Sync>;

pub struct ConnectionManager {
    sessions: DashMap<PlayerId, Session>,
    by_user: DashMap<UserId, PlayerId>,
    live_count: AtomicUsize,
    default_grace: Duration,
    expiry_hook: OnceLock<SessionExpiredHook>,
    /// Weak handle to ourselves so timer tasks can reach back in.
    self_ref: OnceLock<Weak<ConnectionManager>>,
}

impl ConnectionManager {
    pub fn new(default_grace: Duration) -> Arc<Self> {
        let manager = Arc::new(Self {
            sessions: DashMap::new(),
            by_user: DashMap::new(),
            live_count: AtomicUsize::new(0),
            default_grace,
            expiry_hook: OnceLock::new(),
            self_ref: OnceLock::new(),
        });
        let _ = manager.self_ref.set(Arc::downgrade(&manager));
        manager
    }

    fn shared(&self) -> Option<Arc<Self>> {
        self.self_ref.get()?.upgrade()
    }

    /// Wire the teardown path once at startup. The hook runs on a timer task
    /// after a session's grace expires, with the session already removed.
    pub fn install_expiry_hook(&self, hook: SessionExpiredHook) {
        if self.expiry_hook.set(hook).is_err() {
            warn!("session expiry hook installed twice; keeping the first");
        }
    }

    /// Bind a freshly authenticated socket to the user's session, creating
    /// one if needed. An Absent session is revived; a Live one keeps its id
    /// and the older socket is told to close (newer wins).
    pub fn bind(
        &self,
        user_id: UserId,
        username: &str,
        conn_id: Uuid,
        recipient: Recipient<SessionCommand>,
    ) -> BindOutcome {
        let session_id = *self
            .by_user
            .entry(user_id)
            .or_insert_with(Uuid::new_v4)
            .value();

        let mut entry = self.sessions.entry(session_id).or_insert_with(|| {
            info!(session_id = %session_id, user_id = %user_id, "session created");
            Session {
                id: session_id,
                user_id,
                username: username.to_string(),
                socket: SocketState::Absent {
                    since: Instant::now(),
                },
                conn_id,
                epoch: 0,
                last_seen: Instant::now(),
                lobby: None,
                game: None,
                reconnect_grace: self.default_grace,
            }
        });
        let session = entry.value_mut();

        let previous = std::mem::replace(
            &mut session.socket,
            SocketState::Live(recipient),
        );
        session.conn_id = conn_id;
        session.epoch += 1;
        session.last_seen = Instant::now();

        match previous {
            SocketState::Absent { .. } if session.epoch == 1 => {
                self.live_count.fetch_add(1, Ordering::Relaxed);
                BindOutcome::Created { session_id }
            }
            SocketState::Absent { since } => {
                self.live_count.fetch_add(1, Ordering::Relaxed);
                info!(
                    session_id = %session_id,
                    absent_secs = since.elapsed().as_secs(),
                    "session reconnected"
                );
                BindOutcome::Resumed {
                    session_id,
                    was_absent: true,
                    lobby: session.lobby,
                    game: session.game,
                }
            }
            SocketState::Live(old) => {
                debug!(session_id = %session_id, "newer socket displaced a live one");
                let _ = old.try_send(SessionCommand::Close);
                BindOutcome::Resumed {
                    session_id,
                    was_absent: false,
                    lobby: session.lobby,
                    game: session.game,
                }
            }
        }
    }

    /// Socket teardown. A no-op unless `conn_id` still names the session's
    /// current socket. Schedules the grace timer.
    pub fn mark_absent(&self, session_id: PlayerId, conn_id: Uuid) {
        let Some(mut entry) = self.sessions.get_mut(&session_id) else {
            return;
        };
        let session = entry.value_mut();
        if session.conn_id != conn_id || !matches!(session.socket, SocketState::Live(_)) {
            return;
        }
        self.to_absent(session);
        let (epoch, grace) = (session.epoch, session.reconnect_grace);
        drop(entry);
        self.schedule_grace(session_id, epoch, grace);
    }

    fn to_absent(&self, session: &mut Session) {
        session.socket = SocketState::Absent {
            since: Instant::now(),
        };
        session.epoch += 1;
        self.live_count.fetch_sub(1, Ordering::Relaxed);
        info!(session_id = %session.id, "session marked absent");
    }

    fn schedule_grace(&self, session_id: PlayerId, epoch: u64, grace: Duration) {
        let Some(manager) = self.shared() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            manager.expire_if_stale(session_id, epoch);
        });
    }

    fn expire_if_stale(&self, session_id: PlayerId, epoch: u64) {
        // remove_if keeps the check-and-remove atomic against a rebind.
        let expired = self.sessions.remove_if(&session_id, |_, session| {
            session.epoch == epoch && matches!(session.socket, SocketState::Absent { .. })
        });
        let Some((_, session)) = expired else {
            return;
        };
        self.by_user.remove(&session.user_id);
        info!(
            session_id = %session_id,
            lobby = ?session.lobby,
            game = ?session.game,
            "session expired after reconnect grace"
        );
        if let Some(hook) = self.expiry_hook.get() {
            hook(ExpiredSession {
                session_id,
                username: session.username,
                lobby: session.lobby,
                game: session.game,
            });
        }
    }

    /// Deliver one envelope. Live sessions get it now; Absent sessions drop
    /// it (a reconnect synthesizes fresh truth instead of a replay). A full
    /// mailbox closes the socket and flips the session Absent.
    pub fn send(&self, session_id: PlayerId, message: ServerMessage) {
        let Some(mut entry) = self.sessions.get_mut(&session_id) else {
            return;
        };
        let session = entry.value_mut();
        let SocketState::Live(recipient) = &session.socket else {
            return;
        };
        match recipient.try_send(SessionCommand::Deliver(message)) {
            Ok(()) => {}
            Err(err) => {
                warn!(
                    session_id = %session_id,
                    error = %err,
                    "outbound queue overflow; dropping socket"
                );
                if let SocketState::Live(recipient) = &session.socket {
                    let _ = recipient.try_send(SessionCommand::Close);
                }
                self.to_absent(session);
                let (epoch, grace) = (session.epoch, session.reconnect_grace);
                drop(entry);
                self.schedule_grace(session_id, epoch, grace);
            }
        }
    }

    pub fn broadcast(&self, targets: &[PlayerId], message: &ServerMessage) {
        for target in targets {
            self.send(*target, message.clone());
        }
    }

    pub fn touch(&self, session_id: PlayerId) {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.last_seen = Instant::now();
        }
    }

    pub fn username(&self, session_id: PlayerId) -> Option<String> {
        self.sessions.get(&session_id).map(|s| s.username.clone())
    }

    /// The session's lobby/game membership, if any.
    pub fn context(&self, session_id: PlayerId) -> (Option<LobbyId>, Option<GameId>) {
        self.sessions
            .get(&session_id)
            .map(|s| (s.lobby, s.game))
            .unwrap_or((None, None))
    }

    pub fn set_lobby(&self, session_id: PlayerId, lobby: Option<LobbyId>, grace: Option<Duration>) {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.lobby = lobby;
            entry.reconnect_grace = grace.unwrap_or(self.default_grace);
        }
    }

    pub fn enter_game(&self, session_id: PlayerId, game: GameId, grace: Duration) {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.lobby = None;
            entry.game = Some(game);
            entry.reconnect_grace = grace;
        }
    }

    pub fn clear_game(&self, session_id: PlayerId) {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.game = None;
            entry.reconnect_grace = self.default_grace;
        }
    }

    pub fn live_connections(&self) -> usize {
        self.live_count.load(Ordering::Relaxed)
    }

    /// (total, active, inactive) session counts for `/stats`.
    pub fn stats(&self) -> (usize, usize, usize) {
        let total = self.sessions.len();
        let active = self.live_connections();
        (total, active, total.saturating_sub(active))
    }
}
