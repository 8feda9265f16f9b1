use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use royale_core::events::{DamageCause, DamageVerdict, MatchEvent, WorldEvent};

use crate::commands::ChatMessage;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::orchestrator::{MatchOrchestrator, MatchStatus};
use crate::sim_world::{DamageSource, SimWorld};

/// Commands sent from HTTP handlers to the match loop.
#[derive(Debug)]
pub enum MatchCommand {
    Chat { message: ChatMessage, is_admin: bool },
    Stop,
}

/// Ticks averaged for the tick rate sample.
const TICK_RATE_WINDOW: usize = 100;

/// Rolling average of the loop's real tick rate. Skipped ticks show up as
/// longer intervals and pull the rate down.
#[derive(Debug)]
pub struct TickRateMeter {
    intervals: VecDeque<Duration>,
    total: Duration,
    nominal: f64,
}

impl TickRateMeter {
    pub fn new(nominal: f64) -> Self {
        Self {
            intervals: VecDeque::with_capacity(TICK_RATE_WINDOW),
            total: Duration::ZERO,
            nominal,
        }
    }

    pub fn record(&mut self, interval: Duration) {
        if interval.is_zero() {
            return;
        }
        if self.intervals.len() == TICK_RATE_WINDOW
            && let Some(oldest) = self.intervals.pop_front()
        {
            self.total -= oldest;
        }
        self.intervals.push_back(interval);
        self.total += interval;
    }

    /// Ticks per second; the nominal rate until anything was recorded.
    pub fn rate(&self) -> f64 {
        if self.intervals.is_empty() {
            return self.nominal;
        }
        self.intervals.len() as f64 / self.total.as_secs_f64()
    }
}

pub type SharedStatus = Arc<RwLock<MatchStatus>>;

/// Handles to a running match loop.
pub struct MatchSession {
    pub commands: mpsc::Sender<MatchCommand>,
    pub status: SharedStatus,
    pub handle: JoinHandle<()>,
}

/// Build the orchestrator and its first arena, then run the match loop as a
/// tokio task. Fails if the first arena cannot be placed.
pub fn spawn_match_session(
    config: &ServerConfig,
    events: broadcast::Sender<MatchEvent>,
) -> Result<MatchSession, ServerError> {
    let seed = config.match_loop.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let world = SimWorld::new(config.world.clone(), rng.random());
    let mut orch = MatchOrchestrator::new(
        world,
        config.arena.clone(),
        config.match_loop.reset_delay(),
        config.auth.admins.clone(),
        rng,
    );
    orch.start_new_game()?;
    tracing::info!(seed, "Match session created");

    let status: SharedStatus = Arc::new(RwLock::new(orch.status()));
    let (commands, cmd_rx) = mpsc::channel(config.limits.command_buffer);
    let tick_interval = config.match_loop.tick_interval();
    let nominal = config.match_loop.tick_rate_hz;
    let loop_status = Arc::clone(&status);
    let handle = tokio::spawn(async move {
        run_match_loop(orch, tick_interval, nominal, cmd_rx, loop_status, events).await;
    });
    Ok(MatchSession {
        commands,
        status,
        handle,
    })
}

async fn run_match_loop(
    mut orch: MatchOrchestrator<SimWorld>,
    tick_interval: Duration,
    nominal_rate: f64,
    mut cmd_rx: mpsc::Receiver<MatchCommand>,
    status: SharedStatus,
    events: broadcast::Sender<MatchEvent>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let started = Instant::now();
    let mut last_tick = started;
    let mut meter = TickRateMeter::new(nominal_rate);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_tick);
                last_tick = now;
                meter.record(dt);
                orch.world_mut().set_tick_rate_sample(meter.rate());

                resolve_damage(&mut orch, dt.as_secs_f64());
                if let Err(e) = orch.tick(now.duration_since(started)) {
                    tracing::error!(error = %e, "Match loop cannot continue");
                    break;
                }
                publish(&mut orch, &status, &events).await;
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(MatchCommand::Chat { message, is_admin }) => {
                        if let Err(e) = orch.handle_chat(&message, is_admin) {
                            tracing::error!(error = %e, "Match loop cannot continue");
                            break;
                        }
                        publish(&mut orch, &status, &events).await;
                    },
                    Some(MatchCommand::Stop) | None => {
                        tracing::info!("Match loop stopping");
                        break;
                    },
                }
            }
        }
    }

    let mut final_status = orch.status();
    final_status.stopped = true;
    *status.write().await = final_status;
}

/// Step the world and route every damage request through the match: the
/// match may cancel it, and deaths are reported back.
pub fn resolve_damage(orch: &mut MatchOrchestrator<SimWorld>, dt: f64) {
    let requests = orch.world_mut().step(dt);
    for request in requests {
        let cause = match request.source {
            DamageSource::Projectile(source) => DamageCause::Projectile {
                owner: orch.owner_of(source),
            },
            DamageSource::Hazard => DamageCause::Hazard,
            DamageSource::Fall => DamageCause::Fall,
        };
        let verdict = orch.handle_world_event(WorldEvent::AvatarDamaged {
            avatar: request.avatar,
            cause: cause.clone(),
        });
        if verdict == Some(DamageVerdict::Cancel) {
            continue;
        }
        if let Some(died) = orch.world_mut().apply_damage(request.avatar, request.amount, cause) {
            orch.handle_world_event(died);
        }
    }
}

async fn publish(
    orch: &mut MatchOrchestrator<SimWorld>,
    status: &SharedStatus,
    events: &broadcast::Sender<MatchEvent>,
) {
    for event in orch.drain_events() {
        tracing::debug!(?event, "Match event");
        // No subscribers is fine.
        let _ = events.send(event);
    }
    *status.write().await = orch.status();
}
