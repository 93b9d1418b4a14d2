//! Route definitions for the relay.
//!
//! `POST /chat` runs one request through validate → record → prompt →
//! generate → record, answering with `{"reply": ...}` in every case.

use crate::prompt::build_prompt;
use crate::provider::ModelGateway;
use crate::session::{Role, SessionStore};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use relay_common::logging::generate_request_id;
use relay_common::util::{redact_secret, truncate_with_ellipsis};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reply sent for empty or unparseable chat requests.
pub const INVALID_MESSAGE_REPLY: &str = "Please send a valid message.";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub gateway: ModelGateway,
    pub default_session_id: String,
    /// Credential scrubbed from error text before it reaches the caller.
    pub secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        gateway: ModelGateway,
        default_session_id: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            gateway,
            default_session_id: default_session_id.into(),
            secret: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<Arc<str>>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

/// Chat request body.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Chat response body, used for success and failure alike.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

impl ChatReply {
    fn json(reply: impl Into<String>) -> Json<Self> {
        Json(Self {
            reply: reply.into(),
        })
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub sessions: usize,
}

/// Build the relay routes with state applied.
pub fn build_routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Json<ChatRequestBody>, JsonRejection>,
) -> (StatusCode, Json<ChatReply>) {
    let request_id = generate_request_id();

    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(request_id = %request_id, error = %rejection, "Rejected chat body");
            return (StatusCode::BAD_REQUEST, ChatReply::json(INVALID_MESSAGE_REPLY));
        }
    };

    let message = body.message.as_deref().unwrap_or_default().trim();
    let session_id = body
        .session_id
        .unwrap_or_else(|| state.default_session_id.clone());

    if message.is_empty() {
        tracing::debug!(request_id = %request_id, session_id = %session_id, "Empty chat message");
        return (StatusCode::BAD_REQUEST, ChatReply::json(INVALID_MESSAGE_REPLY));
    }

    tracing::info!(
        request_id = %request_id,
        session_id = %session_id,
        message = %truncate_with_ellipsis(message, 80),
        "Chat request"
    );

    state.sessions.append(&session_id, Role::User, message).await;
    let history = state.sessions.get(&session_id).await;
    let prompt = build_prompt(&history);

    match state.gateway.generate(&prompt).await {
        Ok(reply) => {
            state
                .sessions
                .append(&session_id, Role::Assistant, &reply)
                .await;
            let history_len = state.sessions.history_len(&session_id).await;
            tracing::info!(
                request_id = %request_id,
                session_id = %session_id,
                history_len = history_len,
                "Chat reply sent"
            );
            (StatusCode::OK, ChatReply::json(reply))
        }
        Err(e) => {
            let detail = match state.secret.as_deref() {
                Some(secret) => redact_secret(&e.to_string(), secret),
                None => e.to_string(),
            };
            tracing::error!(
                request_id = %request_id,
                session_id = %session_id,
                provider = state.gateway.provider_name(),
                model = state.gateway.model(),
                kind = e.kind(),
                status_code = ?e.status_code(),
                error = %detail,
                "Generation failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ChatReply::json(format!("Error: {detail}")),
            )
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "relay-gateway".into(),
        sessions: state.sessions.session_count().await,
    })
}
