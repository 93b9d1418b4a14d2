//! Relay Gateway - HTTP chat relay in front of a hosted LLM.
//!
//! - Per-session rolling history (last N turns, in memory)
//! - Prompt rendering with a fixed safety instruction
//! - Gemini `generateContent` client behind a `Provider` trait
//! - `POST /chat` and `GET /health`, open CORS
//!
//! ## Architecture
//!
//! ```text
//! Client → /chat → SessionStore (append user) → build_prompt → ModelGateway → Gemini
//!                        ↑                                         │
//!                        └────────── append assistant ─────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod prompt;
pub mod provider;
pub mod routes;
pub mod session;

pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use provider::{
    ChatRequest, ChatResponse, GeminiProvider, GenerationError, ModelGateway, Provider,
    ProviderError, TokenUsage,
};
pub use routes::AppState;
pub use session::{InMemorySessionStore, Role, SessionStore, Turn, MAX_CONTEXT};

use axum::Router;
use relay_common::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::build_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Assemble application state from configuration.
///
/// Fails when the Gemini credential is missing.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    config.validate()?;
    let api_key = config.require_api_key()?;

    let provider = Arc::new(GeminiProvider::with_base_url(
        api_key,
        config.model.api_base.as_str(),
    ));
    let gateway = ModelGateway::new(
        provider,
        config.model.name.as_str(),
        Duration::from_secs(config.model.timeout_secs),
    );
    let sessions = Arc::new(InMemorySessionStore::new(config.session.max_context));

    Ok(AppState::new(sessions, gateway, config.session.default_session_id.as_str())
        .with_secret(api_key))
}

/// Start the relay server and run until Ctrl-C.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let state = build_state(config)?;
    let router = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        model = %config.model.name,
        max_context = config.session.max_context,
        "Starting relay gateway"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Relay gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
