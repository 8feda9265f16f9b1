use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use royale_core::events::MatchEvent;

use crate::state::{AppState, ConnectionGuard};

/// SSE event name for every match event.
const MATCH_EVENT: &str = "match";

/// GET /api/v1/events/stream: live feed of match events as JSON.
///
/// Slow subscribers that fall behind the broadcast buffer lose the oldest
/// events and keep streaming.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, StatusCode> {
    let limit = state.config.limits.max_sse_subscribers;
    let current = state.sse_subscriber_count.load(Ordering::Relaxed);
    if current >= limit {
        tracing::warn!(current, max = limit, "SSE subscriber limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let guard = ConnectionGuard::new(Arc::clone(&state.sse_subscriber_count));
    let updates = BroadcastStream::new(state.events.subscribe());

    let stream = updates.filter_map(move |item: Result<MatchEvent, BroadcastStreamRecvError>| {
        // Held by the stream so the count drops when the client goes away.
        let _guard = &guard;
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("SSE subscriber lagged: {e}");
                return None;
            },
        };
        match SseEvent::default().event(MATCH_EVENT).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::error!("Failed to encode match event: {e}");
                None
            },
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
