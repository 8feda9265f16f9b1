pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod game_loop;
pub mod health;
pub mod orchestrator;
pub mod sim_world;
pub mod sse;
pub mod state;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use config::ServerConfig;
use error::ServerError;
use game_loop::spawn_match_session;
use state::AppState;

/// Start the match loop and build the Axum router around it.
///
/// Must be called from within a tokio runtime. Fails if the first arena
/// cannot be placed.
pub fn build_app(config: ServerConfig) -> Result<(Router<()>, AppState), ServerError> {
    let (events, _) = broadcast::channel(config.limits.broadcast_capacity);
    let session = spawn_match_session(&config, events.clone())?;

    let state = AppState {
        config: Arc::new(config),
        commands: session.commands,
        status: session.status,
        events,
        sse_subscriber_count: Arc::new(AtomicUsize::new(0)),
    };

    let api_routes = Router::new()
        .route("/chat", post(api::post_chat))
        .route("/status", get(api::get_status))
        .route("/events/stream", get(sse::event_stream));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_routes)
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    Ok((app, state))
}
