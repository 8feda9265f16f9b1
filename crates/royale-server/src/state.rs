use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{broadcast, mpsc};

use royale_core::events::MatchEvent;

use crate::config::ServerConfig;
use crate::game_loop::{MatchCommand, SharedStatus};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub commands: mpsc::Sender<MatchCommand>,
    pub status: SharedStatus,
    pub events: broadcast::Sender<MatchEvent>,
    pub sse_subscriber_count: Arc<AtomicUsize>,
}

/// Counts one live connection for as long as it is held.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
