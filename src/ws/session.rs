//! One actor per websocket.
//!
//! The actor authenticates on upgrade, binds itself into the session
//! registry, and from then on is only a pipe: inbound text goes to the
//! router, outbound `SessionCommand`s come from the connection manager. Its
//! mailbox is the bounded per-session outbound queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::jwt::verify_access_token;
use crate::domain::PlayerId;
use crate::router::MessageRouter;
use crate::services::connections::{SessionCommand, UserId};
use crate::state::AppState;
use crate::ws::protocol::{ClientMessage, ServerMessage};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Bounded outbound queue per session; overflow drops the socket.
const OUTBOUND_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

enum Gate {
    Authed { user_id: UserId, username: String },
    Unauthorized,
    AtCapacity,
}

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let gate = match query.token.as_deref() {
        Some(token) => match verify_access_token(token, &app_state.security)
            .and_then(|claims| Ok((claims.user_id()?, claims.username)))
        {
            Ok((user_id, username)) => {
                let live = app_state.router.connections().live_connections();
                if live >= app_state.config.max_connections {
                    warn!(live, max = app_state.config.max_connections, "connection limit hit");
                    Gate::AtCapacity
                } else {
                    Gate::Authed { user_id, username }
                }
            }
            Err(_) => Gate::Unauthorized,
        },
        None => Gate::Unauthorized,
    };

    let session = WsSession::new(gate, Arc::clone(&app_state.router));
    ws::start(session, &req, stream)
}

pub struct WsSession {
    conn_id: Uuid,
    gate: Gate,
    session_id: Option<PlayerId>,
    router: Arc<MessageRouter>,
    last_heartbeat: Instant,
}

impl WsSession {
    fn new(gate: Gate, router: Arc<MessageRouter>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            gate,
            session_id: None,
            router,
            last_heartbeat: Instant::now(),
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "failed to serialize outbound message"),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(
                    conn_id = %actor.conn_id,
                    session_id = ?actor.session_id,
                    "heartbeat timed out"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (user_id, username) = match &self.gate {
            Gate::Authed { user_id, username } => (*user_id, username.clone()),
            Gate::Unauthorized => {
                // Reject before any message, with a policy-violation close.
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Policy)));
                ctx.stop();
                return;
            }
            Gate::AtCapacity => {
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Again)));
                ctx.stop();
                return;
            }
        };

        ctx.set_mailbox_capacity(OUTBOUND_QUEUE_CAPACITY);
        let recipient = ctx.address().recipient::<SessionCommand>();
        let session_id = self
            .router
            .connect(user_id, &username, self.conn_id, recipient);
        self.session_id = Some(session_id);
        info!(
            conn_id = %self.conn_id,
            session_id = %session_id,
            username = %username,
            "websocket session started"
        );
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(session_id) = self.session_id {
            self.router.disconnect(session_id, self.conn_id);
            info!(
                conn_id = %self.conn_id,
                session_id = %session_id,
                "websocket session stopped"
            );
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                let Some(session_id) = self.session_id else {
                    return;
                };
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => self.router.route(session_id, message),
                    Err(err) => {
                        // Malformed envelopes get an error; the socket stays.
                        Self::send_json(
                            ctx,
                            &ServerMessage::Error {
                                message: format!("Malformed message: {err}"),
                            },
                        );
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                Self::send_json(
                    ctx,
                    &ServerMessage::Error {
                        message: "Binary frames are not supported".to_string(),
                    },
                );
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(
                    conn_id = %self.conn_id,
                    session_id = ?self.session_id,
                    error = %err,
                    "websocket protocol error"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

impl Handler<SessionCommand> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: SessionCommand, ctx: &mut Self::Context) -> Self::Result {
        match msg {
            SessionCommand::Deliver(message) => Self::send_json(ctx, &message),
            SessionCommand::Close => {
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
            }
        }
    }
}
