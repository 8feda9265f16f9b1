use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use royale_core::phase::Phase;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub sse: usize,
}

#[derive(Serialize)]
pub struct MatchInfo {
    pub phase: Phase,
    pub participants: usize,
    pub living: usize,
    pub running: bool,
}

/// Server status, connection counts, and a short match summary.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let sse = state.sse_subscriber_count.load(Ordering::Relaxed);
    let match_info = {
        let status = state.status.read().await;
        MatchInfo {
            phase: status.phase,
            participants: status.participants.len(),
            living: status.living,
            running: !status.stopped,
        }
    };

    Json(HealthResponse {
        status: if match_info.running { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo { sse },
        match_info,
    })
}

/// Readiness check: the match loop must still be running.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.status.read().await.stopped || state.commands.is_closed() {
        return (StatusCode::SERVICE_UNAVAILABLE, "not ready: match loop stopped");
    }
    (StatusCode::OK, "ready")
}
