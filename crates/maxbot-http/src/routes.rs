//! Routes and handlers for the control endpoint.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use maxbot_core::{
    config::Config,
    domain::{ChatId, UserId},
    moderation::Moderator,
    ports::ChatPort,
    Error,
};

#[derive(Clone)]
pub struct ControlState {
    pub cfg: Arc<Config>,
    pub chat: Arc<dyn ChatPort>,
    pub moderator: Arc<Moderator>,
}

pub fn create_router(state: ControlState) -> Router {
    Router::new()
        .route("/", get(online))
        .route("/command", post(command))
        .with_state(state)
}

pub async fn serve(bind: SocketAddr, state: ControlState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("control endpoint listening on {bind}");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

async fn online() -> Json<serde_json::Value> {
    Json(json!({"message": "Bot is online"}))
}

/// Body of `POST /command`. `guild_id` is the numeric group-chat id; the
/// field name is kept for compatibility with existing callers.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub api_key: String,
    pub guild_id: i64,
    pub user_id: i64,
    pub action: String,
    #[serde(default)]
    pub reason: Option<String>,
}

async fn command(
    State(state): State<ControlState>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    info!(
        "control command: action={} guild={} user={}",
        req.action, req.guild_id, req.user_id
    );

    // Authentication is an exact match against the shared secret; it comes
    // before any platform lookup so a bad key never touches the platform.
    if req.api_key != state.cfg.bot_api_key {
        warn!("control command rejected: invalid api key");
        return Err(AppError::InvalidKey);
    }

    let chat_id = ChatId(req.guild_id);
    let user_id = UserId(req.user_id);
    let name = state.chat.member_name(chat_id, user_id).await?;
    let reason = req.reason.as_deref().unwrap_or("breaking the rules");

    let message = match req.action.as_str() {
        "warn" => {
            state.moderator.warn_member(chat_id, &name, reason).await?;
            format!("warning issued to {name}")
        }
        "mute" => {
            state
                .moderator
                .mute_member(chat_id, user_id, &name, reason)
                .await?;
            format!("{name} muted")
        }
        "ban" => {
            state
                .moderator
                .ban_member(chat_id, user_id, &name, reason)
                .await?;
            format!("{name} banned")
        }
        other => return Err(AppError::InvalidAction(other.to_string())),
    };

    Ok(Json(json!({"message": message})))
}

enum AppError {
    InvalidKey,
    NotFound(String),
    InvalidAction(String),
    Forbidden(String),
    Internal(String),
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound(m) => AppError::NotFound(m),
            Error::Forbidden(m) => AppError::Forbidden(m),
            Error::InvalidAction(m) => AppError::InvalidAction(m),
            Error::InvalidCredential => AppError::InvalidKey,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidKey => (StatusCode::UNAUTHORIZED, "invalid API key".to_string()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            AppError::InvalidAction(m) => {
                (StatusCode::BAD_REQUEST, format!("invalid action: {m}"))
            }
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            AppError::Internal(m) => {
                error!("control command failed: {m}");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };

        (status, Json(json!({"error": message}))).into_response()
    }
}
