use std::time::SystemTime;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::mint_access_token;
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub user_id: String,
}

async fn register(
    req: web::Json<CredentialsRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("Username cannot be empty"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(&req.password)?;
    let user = app_state
        .users
        .create(username, &password_hash)
        .map_err(|_| AppError::conflict("Username already taken"))?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    let token = mint_access_token(
        user.id,
        &user.username,
        SystemTime::now(),
        &app_state.security,
    )?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        username: user.username,
        user_id: user.id.to_string(),
    }))
}

async fn login(
    req: web::Json<CredentialsRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = app_state
        .users
        .find_by_username(req.username.trim())
        .ok_or_else(AppError::unauthorized)?;
    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::unauthorized());
    }

    let token = mint_access_token(
        user.id,
        &user.username,
        SystemTime::now(),
        &app_state.security,
    )?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        username: user.username,
        user_id: user.id.to_string(),
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/register").route(web::post().to(register)))
        .service(web::resource("/api/login").route(web::post().to(login)));
}
