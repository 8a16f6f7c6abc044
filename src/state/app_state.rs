use std::sync::Arc;

use crate::config::ServerConfig;
use crate::router::MessageRouter;
use crate::services::connections::ConnectionManager;
use crate::services::games::GameManager;
use crate::services::lobbies::LobbyManager;
use crate::state::security_config::SecurityConfig;
use crate::store::archive::{GameArchive, LoggingArchive};
use crate::store::users::{InMemoryUserStore, UserStore};

/// Shared application state: configuration, collaborators, and the router
/// that fronts the three live-state managers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub security: SecurityConfig,
    pub users: Arc<dyn UserStore>,
    pub router: Arc<MessageRouter>,
}

impl AppState {
    pub fn build(config: ServerConfig, security: SecurityConfig) -> Self {
        let archive: Arc<dyn GameArchive> = Arc::new(LoggingArchive);
        let connections = ConnectionManager::new(config.default_reconnect_grace());
        let lobbies = Arc::new(LobbyManager::new(Arc::clone(&archive)));
        let games = GameManager::new(archive);
        let router = MessageRouter::new(connections, lobbies, games);

        Self {
            config,
            security,
            users: Arc::new(InMemoryUserStore::new()),
            router,
        }
    }
}
