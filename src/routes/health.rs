use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ConnectionStats {
    total: usize,
    active: usize,
    inactive: usize,
}

#[derive(Debug, Serialize)]
struct GameStats {
    active_games: usize,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    connections: ConnectionStats,
    games: GameStats,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

async fn stats(app_state: web::Data<AppState>) -> HttpResponse {
    let (total, active, inactive) = app_state.router.connections().stats();
    HttpResponse::Ok().json(StatsResponse {
        connections: ConnectionStats {
            total,
            active,
            inactive,
        },
        games: GameStats {
            active_games: app_state.router.games().active_games(),
        },
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/stats", web::get().to(stats));
}
