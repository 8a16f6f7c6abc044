use actix_web::{web, App, HttpServer};
use gbridge_backend::config::ServerConfig;
use gbridge_backend::routes;
use gbridge_backend::state::{AppState, SecurityConfig};
use gbridge_backend::telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();
    telemetry::init_tracing(config.log_level.as_deref());

    tracing::info!(
        host = %config.host,
        port = config.port,
        max_connections = config.max_connections,
        turn_timeout_secs = config.turn_timeout_secs,
        database = config.database_url.is_some(),
        "starting German Bridge backend"
    );

    let security = SecurityConfig::from_env();
    let app_state = AppState::build(config.clone(), security);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
