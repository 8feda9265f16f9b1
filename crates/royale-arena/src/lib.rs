pub mod arena;
pub mod config;
pub mod error;
pub mod timer;

use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;

use royale_core::context::MatchContext;
use royale_core::events::{DamageCause, DamageVerdict, MatchEvent, MatchOutcome};
use royale_core::geometry::Point;
use royale_core::participant::{AvatarRef, ParticipantId};
use royale_core::phase::Phase;
use royale_core::world::WorldPort;

use arena::{Arena, heading_offset, place_arena};
use config::ArenaConfig;
use error::ArenaError;
use timer::{Timer, TimerKind};

/// Drives one arena through its lifecycle: readiness, lobby, rounds, sudden
/// death, and teardown. All time comes from the `MatchContext` clock; the
/// controller never sleeps and only touches the world through `WorldPort`.
pub struct ArenaController {
    id: u64,
    arena: Arena,
    config: ArenaConfig,
    readiness: Timer,
    auto_start: Timer,
    rounds: Timer,
    hazard: Timer,
    next_seq: u64,
    round_interval: Duration,
    current_round_start: Option<Duration>,
    next_round_start: Option<Duration>,
    starting_participants: usize,
    rounds_fired: u32,
    sudden_death: bool,
    match_decided: bool,
    disposed: bool,
    rng: StdRng,
}

impl ArenaController {
    /// Place a new arena and start probing for readiness on the next tick.
    pub fn new<W: WorldPort>(
        id: u64,
        config: ArenaConfig,
        ctx: &mut MatchContext<W>,
        mut rng: StdRng,
    ) -> Result<Self, ArenaError> {
        let problems = config.problems();
        if !problems.is_empty() {
            return Err(ArenaError::InvalidConfig(problems.join("; ")));
        }
        let arena = place_arena(&config, &mut ctx.world, &mut rng)?;
        let mut controller = Self {
            id,
            arena,
            round_interval: config.initial_round_interval(),
            config,
            readiness: Timer::new(),
            auto_start: Timer::new(),
            rounds: Timer::new(),
            hazard: Timer::new(),
            next_seq: 0,
            current_round_start: None,
            next_round_start: None,
            starting_participants: 0,
            rounds_fired: 0,
            sudden_death: false,
            match_decided: false,
            disposed: false,
            rng,
        };
        let seq = controller.next_seq();
        let poll = controller.config.readiness_poll();
        controller.readiness.schedule_repeating(ctx.now(), poll, seq);
        tracing::info!(arena = id, origin = ?controller.arena.origin(), "Arena created");
        Ok(controller)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn timer(&self, kind: TimerKind) -> &Timer {
        match kind {
            TimerKind::ReadinessProbe => &self.readiness,
            TimerKind::AutoStart => &self.auto_start,
            TimerKind::RoundCadence => &self.rounds,
            TimerKind::Hazard => &self.hazard,
        }
    }

    fn timer_mut(&mut self, kind: TimerKind) -> &mut Timer {
        match kind {
            TimerKind::ReadinessProbe => &mut self.readiness,
            TimerKind::AutoStart => &mut self.auto_start,
            TimerKind::RoundCadence => &mut self.rounds,
            TimerKind::Hazard => &mut self.hazard,
        }
    }

    pub fn active_timer_count(&self) -> usize {
        TimerKind::ALL
            .iter()
            .filter(|&&k| self.timer(k).is_active())
            .count()
    }

    /// Delay between the next two rounds.
    pub fn round_interval(&self) -> Duration {
        self.round_interval
    }

    pub fn current_round_start(&self) -> Option<Duration> {
        self.current_round_start
    }

    pub fn next_round_start(&self) -> Option<Duration> {
        self.next_round_start
    }

    /// Living avatars when the rounds started.
    pub fn starting_participants(&self) -> usize {
        self.starting_participants
    }

    pub fn rounds_fired(&self) -> u32 {
        self.rounds_fired
    }

    pub fn is_sudden_death(&self) -> bool {
        self.sudden_death
    }

    pub fn is_match_decided(&self) -> bool {
        self.match_decided
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Fire every timer due at the context's current time, earliest first,
    /// ties broken by submission order. Each timer fires at most once per tick.
    pub fn tick<W: WorldPort>(&mut self, ctx: &mut MatchContext<W>) {
        if self.disposed {
            return;
        }
        let now = ctx.now();
        let mut due: Vec<(Duration, u64, TimerKind)> = TimerKind::ALL
            .iter()
            .filter_map(|&kind| {
                let timer = self.timer(kind);
                timer
                    .due_at()
                    .filter(|&at| at <= now)
                    .map(|at| (at, timer.seq(), kind))
            })
            .collect();
        due.sort();

        for (_, _, kind) in due {
            // An earlier callback this tick may have cancelled or rescheduled it.
            if self.disposed || !self.timer(kind).is_due(now) {
                continue;
            }
            self.timer_mut(kind).consume(now);
            tracing::trace!(arena = self.id, timer = %kind, "Timer fired");
            match kind {
                TimerKind::ReadinessProbe => self.probe_readiness(ctx),
                TimerKind::AutoStart => {
                    self.start_rounds(ctx);
                },
                TimerKind::RoundCadence => self.fire_round(ctx),
                TimerKind::Hazard => {
                    if self.sudden_death {
                        self.spawn_hazard(ctx);
                    } else {
                        self.start_sudden_death(ctx);
                    }
                },
            }
        }
    }

    fn probe_readiness<W: WorldPort>(&mut self, ctx: &mut MatchContext<W>) {
        let tick_rate = ctx.world.current_tick_rate_sample();
        if tick_rate < self.config.min_tick_rate {
            tracing::debug!(arena = self.id, tick_rate, "World too slow, arena not ready");
            return;
        }
        let regions = self.arena.region_box(self.config.region_size);
        if !ctx.world.are_regions_loaded(&regions) {
            tracing::debug!(arena = self.id, regions = regions.region_count(), "Arena regions still loading");
            return;
        }

        self.readiness.cancel();
        if !ctx.enter_lobby() {
            tracing::warn!(arena = self.id, phase = %ctx.phase(), "Arena ready but lobby could not open");
            return;
        }
        ctx.emit(MatchEvent::ArenaReady {
            arena_id: self.id,
            origin: self.arena.origin(),
        });
        let seq = self.next_seq();
        self.auto_start
            .schedule_once(ctx.now() + self.config.auto_start_delay(), seq);
        tracing::info!(arena = self.id, "Arena ready, lobby open");
    }

    /// Close the lobby and begin firing rounds. Returns false (doing nothing)
    /// unless the match is currently in the lobby.
    pub fn start_rounds<W: WorldPort>(&mut self, ctx: &mut MatchContext<W>) -> bool {
        if self.disposed || ctx.phase() != Phase::Lobby {
            tracing::debug!(arena = self.id, phase = %ctx.phase(), "Rounds already started or not ready");
            return false;
        }
        self.auto_start.cancel();

        ctx.advance_phase(Phase::PreGameplay);
        self.starting_participants = ctx.registry.living_count(&ctx.world);
        ctx.advance_phase(Phase::Gameplay);
        tracing::info!(
            arena = self.id,
            participants = self.starting_participants,
            "Rounds started"
        );

        self.fire_round(ctx);
        let seq = self.next_seq();
        self.hazard
            .schedule_once(ctx.now() + self.config.hazard_delay(), seq);
        true
    }

    /// Launch a projectile for every armed participant with a living avatar
    /// and schedule the next round.
    pub fn fire_round<W: WorldPort>(&mut self, ctx: &mut MatchContext<W>) {
        if self.disposed || !ctx.phase().allows_rounds() {
            tracing::debug!(arena = self.id, phase = %ctx.phase(), "Skipping round outside gameplay");
            return;
        }
        let now = ctx.now();
        let next_at = now + self.round_interval;
        self.current_round_start = Some(now);
        self.next_round_start = Some(next_at);
        let seq = self.next_seq();
        self.rounds.schedule_once(next_at, seq);
        self.round_interval = self
            .round_interval
            .mul_f64(self.config.round_interval_decay)
            .max(self.config.min_round_interval());

        let shooters: Vec<(ParticipantId, AvatarRef, _)> = ctx
            .registry
            .living(&ctx.world)
            .filter(|p| p.aim.armed)
            .filter_map(|p| p.avatar.map(|a| (p.id.clone(), a, p.aim.shot())))
            .collect();

        let mut launched = 0;
        for (participant, avatar, shot) in shooters {
            match ctx.world.launch_projectile(avatar, &shot) {
                Ok(()) => launched += 1,
                Err(e) => tracing::warn!(arena = self.id, %participant, "Launch failed: {e}"),
            }
        }

        self.rounds_fired += 1;
        tracing::debug!(arena = self.id, round = self.rounds_fired, launched, "Round fired");
        ctx.emit(MatchEvent::RoundFired {
            round_index: self.rounds_fired,
            launched,
        });
    }

    /// Switch the hazard timer to repeating spawns, starting with one right
    /// now. Returns false if sudden death is already running, the match is
    /// already decided or it is not in gameplay.
    pub fn start_sudden_death<W: WorldPort>(&mut self, ctx: &mut MatchContext<W>) -> bool {
        if self.disposed || self.sudden_death || self.match_decided || ctx.phase() != Phase::Gameplay {
            return false;
        }
        self.hazard.cancel();
        self.sudden_death = true;
        let seq = self.next_seq();
        let period = self.config.hazard_period();
        self.hazard.schedule_repeating(ctx.now() + period, period, seq);
        tracing::info!(arena = self.id, "Sudden death");
        ctx.emit(MatchEvent::HazardEscalated { arena_id: self.id });
        self.spawn_hazard(ctx);
        true
    }

    fn spawn_hazard<W: WorldPort>(&mut self, ctx: &mut MatchContext<W>) {
        let (x, z) = self.arena.random_block_column(&mut self.rng);
        let y = ctx.world.highest_surface_at(x, z) + self.config.hazard_height_offset;
        ctx.world.spawn_hazard(Point::new(x as f64, y, z as f64));
    }

    /// Stop hazard spawns. Safe to call at any time.
    pub fn cancel_hazard(&mut self) -> bool {
        self.sudden_death = false;
        self.hazard.cancel()
    }

    /// Cancel every timer and remove every participant's avatar, dead or
    /// alive. Only the first call does anything.
    pub fn dispose<W: WorldPort>(&mut self, ctx: &mut MatchContext<W>) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.sudden_death = false;
        for kind in TimerKind::ALL {
            self.timer_mut(kind).cancel();
        }

        let avatars: Vec<(ParticipantId, AvatarRef)> = ctx
            .registry
            .iter()
            .filter_map(|p| p.avatar.map(|a| (p.id.clone(), a)))
            .collect();
        for (id, avatar) in &avatars {
            ctx.world.remove_avatar(*avatar);
            if let Some(p) = ctx.registry.get_mut(id) {
                p.avatar = None;
            }
        }
        tracing::info!(arena = self.id, removed = avatars.len(), "Arena disposed");
        true
    }

    /// A drop-in point above the surface somewhere in the arena.
    fn random_drop_point<W: WorldPort>(&mut self, world: &W) -> Point {
        let p = self.arena.random_spawn_point(&mut self.rng);
        let surface = world.highest_surface_at(p.block_x(), p.block_z());
        p.with_y(surface + self.config.spawn_drop_height)
    }

    /// Give a registered participant their avatar. Returns `None` if they are
    /// unknown or already have one.
    pub fn spawn_avatar<W: WorldPort>(
        &mut self,
        ctx: &mut MatchContext<W>,
        participant: &str,
    ) -> Option<AvatarRef> {
        if self.disposed {
            return None;
        }
        let name = match ctx.registry.get(participant) {
            Some(p) if p.can_place_avatar() => p.name().to_string(),
            _ => return None,
        };
        let at = self.random_drop_point(&ctx.world);
        let avatar = ctx.world.spawn_avatar(at, &name);
        if let Some(p) = ctx.registry.get_mut(participant) {
            p.avatar = Some(avatar);
        }

        let number = ctx.registry.iter().filter(|p| p.avatar.is_some()).count();
        let (relative_x, relative_z) = self.arena.relative_position(&at);
        tracing::info!(
            arena = self.id,
            participant,
            %avatar,
            sector = self.arena.sector_name(&at),
            "Avatar spawned"
        );
        ctx.emit(MatchEvent::ParticipantJoined {
            participant: participant.to_string(),
            number,
            relative_x,
            relative_z,
        });
        Some(avatar)
    }

    /// Move a participant's living avatar to a fresh random point.
    pub fn relocate_avatar<W: WorldPort>(&mut self, ctx: &mut MatchContext<W>, participant: &str) -> bool {
        if self.disposed {
            return false;
        }
        let Some(avatar) = ctx.registry.get(participant).and_then(|p| p.avatar) else {
            return false;
        };
        if !ctx.world.is_avatar_alive(avatar) {
            return false;
        }
        let to = self.random_drop_point(&ctx.world);
        ctx.world.teleport_avatar(avatar, to);
        tracing::debug!(arena = self.id, participant, %avatar, "Avatar relocated");
        true
    }

    /// Short-range teleport: random distance, given or random heading.
    /// Consumes the cooldown and disarms the participant on success.
    pub fn special_teleport<W: WorldPort>(
        &mut self,
        ctx: &mut MatchContext<W>,
        participant: &str,
        direction: Option<i32>,
    ) -> bool {
        if self.disposed {
            return false;
        }
        let now = ctx.now();
        let Some(p) = ctx.registry.get(participant) else {
            return false;
        };
        let Some(avatar) = p.avatar.filter(|&a| ctx.world.is_avatar_alive(a)) else {
            return false;
        };
        if !p.can_use_ability(now) {
            tracing::debug!(
                participant,
                remaining_ms = p.ability_cooldown(now).as_millis() as u64,
                "Teleport on cooldown"
            );
            return false;
        }
        let Some(from) = ctx.world.avatar_position(avatar) else {
            return false;
        };

        let degrees = direction.unwrap_or_else(|| self.rng.random_range(0..359));
        let distance = self
            .rng
            .random_range(self.config.teleport_min_distance..=self.config.teleport_max_distance);
        let (dx, dz) = heading_offset(degrees, distance as f64);
        let target = from.offset(dx, 0.0, dz).centered_on_block();
        if !self.arena.is_inside(&target) {
            tracing::debug!(participant, degrees, distance, "Teleport would leave the arena");
            return false;
        }
        let surface = ctx.world.highest_surface_at(target.block_x(), target.block_z());
        let target = target.with_y(surface + self.config.teleport_height_offset);
        ctx.world.teleport_avatar(avatar, target);

        let cooldown = self.config.teleport_cooldown();
        if let Some(p) = ctx.registry.get_mut(participant) {
            p.aim.disarm();
            p.ability_ready_at = now + cooldown;
        }
        tracing::debug!(participant, degrees, distance, "Avatar teleported");
        true
    }

    /// Record a death and decide the match if it is over. Returns the outcome
    /// the first time the match is decided in this arena.
    pub fn on_avatar_died<W: WorldPort>(
        &mut self,
        ctx: &mut MatchContext<W>,
        avatar: AvatarRef,
        cause: DamageCause,
    ) -> Option<MatchOutcome> {
        let Some(victim) = ctx.registry.owner_of(avatar).map(|p| p.id.clone()) else {
            tracing::debug!(%avatar, "Death of an avatar nobody owns");
            return None;
        };
        if let DamageCause::Projectile { owner: Some(killer) } = &cause
            && *killer != victim
        {
            ctx.registry.record_kill(killer);
        }

        let remaining = ctx.registry.living_count(&ctx.world);
        tracing::info!(arena = self.id, participant = %victim, ?cause, remaining, "Avatar died");
        ctx.emit(MatchEvent::AvatarDied {
            participant: victim,
            cause,
            remaining,
        });

        if self.disposed || self.match_decided || ctx.phase() != Phase::Gameplay {
            return None;
        }
        let outcome = match remaining {
            0 => MatchOutcome::Drawn,
            1 => {
                let winner = ctx.registry.last_remaining(&ctx.world)?.id.clone();
                MatchOutcome::Won(winner)
            },
            _ => return None,
        };
        self.match_decided = true;
        self.cancel_hazard();
        let starting_participants = self.starting_participants;
        match &outcome {
            MatchOutcome::Won(winner) => {
                tracing::info!(arena = self.id, %winner, starting_participants, "Match won");
                ctx.emit(MatchEvent::MatchWon {
                    participant: winner.clone(),
                    starting_participants,
                });
            },
            MatchOutcome::Drawn => {
                tracing::info!(arena = self.id, starting_participants, "Match drawn");
                ctx.emit(MatchEvent::MatchDrawn {
                    starting_participants,
                });
            },
        }
        Some(outcome)
    }

    /// Environmental damage is harmless until gameplay starts.
    pub fn on_avatar_damaged<W: WorldPort>(
        &self,
        ctx: &MatchContext<W>,
        avatar: AvatarRef,
        cause: &DamageCause,
    ) -> DamageVerdict {
        let ours = ctx.registry.owner_of(avatar).is_some();
        if ours && cause.is_environmental() && ctx.phase() != Phase::Gameplay {
            DamageVerdict::Cancel
        } else {
            DamageVerdict::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use royale_core::parser::CombatParameters;
    use royale_core::test_helpers::FakeWorld;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn setup() -> (ArenaController, MatchContext<FakeWorld>) {
        let mut ctx = MatchContext::new(FakeWorld::new());
        let ctrl = ArenaController::new(1, ArenaConfig::default(), &mut ctx, StdRng::seed_from_u64(7))
            .unwrap();
        (ctrl, ctx)
    }

    fn advance(ctrl: &mut ArenaController, ctx: &mut MatchContext<FakeWorld>, to: f64) {
        ctx.set_now(secs(to));
        ctrl.tick(ctx);
    }

    fn join(ctrl: &mut ArenaController, ctx: &mut MatchContext<FakeWorld>, name: &str, armed: bool) -> AvatarRef {
        let p = ctx.registry.get_or_create(name, None);
        if armed {
            p.aim.set_full(CombatParameters {
                direction: 90,
                elevation: -45,
                power: 50,
                lifetime: 2.5,
            });
        }
        ctrl.spawn_avatar(ctx, name).unwrap()
    }

    /// Ready the arena and open the lobby at t = 0.
    fn lobby() -> (ArenaController, MatchContext<FakeWorld>) {
        let (mut ctrl, mut ctx) = setup();
        advance(&mut ctrl, &mut ctx, 0.0);
        assert_eq!(ctx.phase(), Phase::Lobby);
        ctx.drain_events();
        (ctrl, ctx)
    }

    fn count<F: Fn(&MatchEvent) -> bool>(ctx: &MatchContext<FakeWorld>, f: F) -> usize {
        ctx.pending_events().iter().filter(|e| f(e)).count()
    }

    #[test]
    fn readiness_probe_runs_immediately() {
        let (mut ctrl, mut ctx) = setup();
        assert!(ctrl.timer(TimerKind::ReadinessProbe).is_active());
        advance(&mut ctrl, &mut ctx, 0.0);
        assert_eq!(ctx.phase(), Phase::Lobby);
        assert_eq!(count(&ctx, |e| matches!(e, MatchEvent::ArenaReady { arena_id: 1, .. })), 1);
        assert!(!ctrl.timer(TimerKind::ReadinessProbe).is_active());
        assert_eq!(ctrl.timer(TimerKind::AutoStart).due_at(), Some(secs(60.0)));
    }

    #[test]
    fn readiness_waits_for_regions_and_tick_rate() {
        let (mut ctrl, mut ctx) = setup();
        ctx.world.regions_loaded = false;
        for t in [0.0, 1.0, 2.0, 3.0, 4.0] {
            advance(&mut ctrl, &mut ctx, t);
        }
        assert_eq!(ctx.world.region_probes, 3);
        assert_eq!(ctx.phase(), Phase::CreatingArena);

        ctx.world.regions_loaded = true;
        ctx.world.tick_rate = 19.4;
        advance(&mut ctrl, &mut ctx, 6.0);
        assert_eq!(ctx.phase(), Phase::CreatingArena);
        assert_eq!(ctx.world.region_probes, 3);

        ctx.world.tick_rate = 19.5;
        advance(&mut ctrl, &mut ctx, 8.0);
        assert_eq!(ctx.phase(), Phase::Lobby);
        advance(&mut ctrl, &mut ctx, 10.0);
        assert_eq!(ctx.world.region_probes, 4);
    }

    #[test]
    fn auto_start_fires_first_round_immediately() {
        let (mut ctrl, mut ctx) = lobby();
        join(&mut ctrl, &mut ctx, "a", true);
        join(&mut ctrl, &mut ctx, "b", false);
        advance(&mut ctrl, &mut ctx, 59.9);
        assert_eq!(ctx.phase(), Phase::Lobby);

        advance(&mut ctrl, &mut ctx, 60.0);
        assert_eq!(ctx.phase(), Phase::Gameplay);
        assert_eq!(ctrl.starting_participants(), 2);
        assert_eq!(ctrl.rounds_fired(), 1);
        assert_eq!(ctx.world.launches.len(), 1);
        assert_eq!(ctrl.next_round_start(), Some(secs(80.0)));
        assert_eq!(ctrl.timer(TimerKind::Hazard).due_at(), Some(secs(360.0)));
        assert!(!ctrl.timer(TimerKind::AutoStart).is_active());
    }

    #[test]
    fn start_rounds_is_idempotent_and_cancels_auto_start() {
        let (mut ctrl, mut ctx) = lobby();
        advance(&mut ctrl, &mut ctx, 5.0);
        assert!(ctrl.start_rounds(&mut ctx));
        assert!(!ctrl.start_rounds(&mut ctx));
        assert!(!ctrl.timer(TimerKind::AutoStart).is_active());
        advance(&mut ctrl, &mut ctx, 65.0);
        assert_eq!(ctrl.rounds_fired(), 2);
        assert_eq!(count(&ctx, |e| matches!(e, MatchEvent::PhaseChanged { new: Phase::Gameplay, .. })), 1);
    }

    #[test]
    fn start_rounds_before_lobby_does_nothing() {
        let (mut ctrl, mut ctx) = setup();
        assert!(!ctrl.start_rounds(&mut ctx));
        assert_eq!(ctx.phase(), Phase::CreatingArena);
    }

    #[test]
    fn round_interval_decays_to_floor() {
        let (mut ctrl, mut ctx) = lobby();
        ctrl.start_rounds(&mut ctx);
        let mut previous = ctrl.round_interval();
        assert!((previous.as_secs_f64() - 18.0).abs() < 1e-6);
        for _ in 0..60 {
            ctrl.fire_round(&mut ctx);
            let current = ctrl.round_interval();
            let expected = (previous.as_secs_f64() * 0.9).max(1.0);
            assert!((current.as_secs_f64() - expected).abs() < 1e-6);
            assert!(current <= previous);
            assert!(current >= Duration::from_secs(1));
            previous = current;
        }
        assert_eq!(ctrl.round_interval(), Duration::from_secs(1));
    }

    #[test]
    fn rounds_follow_the_cadence() {
        let (mut ctrl, mut ctx) = lobby();
        ctrl.start_rounds(&mut ctx);
        advance(&mut ctrl, &mut ctx, 19.9);
        assert_eq!(ctrl.rounds_fired(), 1);
        advance(&mut ctrl, &mut ctx, 20.0);
        assert_eq!(ctrl.rounds_fired(), 2);
        assert_eq!(ctrl.next_round_start(), Some(secs(38.0)));
        advance(&mut ctrl, &mut ctx, 38.0);
        assert_eq!(ctrl.rounds_fired(), 3);
    }

    #[test]
    fn failing_launch_does_not_stop_the_batch() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", true);
        join(&mut ctrl, &mut ctx, "b", true);
        let dead = join(&mut ctrl, &mut ctx, "c", true);
        ctx.world.failing_launches.insert(a);
        ctx.world.kill(dead);
        ctrl.start_rounds(&mut ctx);
        assert_eq!(ctx.world.launches.len(), 1);
        assert_eq!(
            count(&ctx, |e| matches!(e, MatchEvent::RoundFired { round_index: 1, launched: 1 })),
            1
        );
    }

    #[test]
    fn sudden_death_spawns_immediately_then_repeats() {
        let (mut ctrl, mut ctx) = lobby();
        join(&mut ctrl, &mut ctx, "a", false);
        join(&mut ctrl, &mut ctx, "b", false);
        ctrl.start_rounds(&mut ctx);
        advance(&mut ctrl, &mut ctx, 299.9);
        assert!(ctx.world.hazards.is_empty());

        advance(&mut ctrl, &mut ctx, 300.0);
        assert!(ctrl.is_sudden_death());
        assert_eq!(ctx.world.hazards.len(), 1);
        assert_eq!(count(&ctx, |e| matches!(e, MatchEvent::HazardEscalated { .. })), 1);
        advance(&mut ctrl, &mut ctx, 300.5);
        advance(&mut ctrl, &mut ctx, 301.0);
        assert_eq!(ctx.world.hazards.len(), 3);
        for h in &ctx.world.hazards {
            assert!((h.y - 69.0).abs() < f64::EPSILON);
            assert!(ctrl.arena().is_inside(h));
        }
        assert!(!ctrl.start_sudden_death(&mut ctx));

        assert!(ctrl.cancel_hazard());
        assert!(!ctrl.cancel_hazard());
        advance(&mut ctrl, &mut ctx, 310.0);
        assert_eq!(ctx.world.hazards.len(), 3);
    }

    #[test]
    fn sudden_death_requires_gameplay() {
        let (mut ctrl, mut ctx) = lobby();
        assert!(!ctrl.start_sudden_death(&mut ctx));
        assert!(ctx.world.hazards.is_empty());
    }

    #[test]
    fn decided_match_cannot_restart_sudden_death() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", false);
        join(&mut ctrl, &mut ctx, "b", false);
        ctrl.start_rounds(&mut ctx);
        assert!(ctrl.start_sudden_death(&mut ctx));
        let spawned = ctx.world.hazards.len();

        ctx.world.kill(a);
        assert!(ctrl.on_avatar_died(&mut ctx, a, DamageCause::Hazard).is_some());
        assert!(!ctrl.is_sudden_death());

        assert!(!ctrl.start_sudden_death(&mut ctx));
        assert!(!ctrl.timer(TimerKind::Hazard).is_active());
        advance(&mut ctrl, &mut ctx, 60.0);
        assert_eq!(ctx.world.hazards.len(), spawned);
    }

    #[test]
    fn last_survivor_wins_once_even_with_simultaneous_deaths() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", false);
        let b = join(&mut ctrl, &mut ctx, "b", false);
        join(&mut ctrl, &mut ctx, "c", false);
        ctrl.start_rounds(&mut ctx);
        ctrl.start_sudden_death(&mut ctx);
        ctx.drain_events();

        ctx.world.kill(a);
        ctx.world.kill(b);
        let first = ctrl.on_avatar_died(&mut ctx, a, DamageCause::Hazard);
        let second = ctrl.on_avatar_died(&mut ctx, b, DamageCause::Hazard);
        assert_eq!(first, Some(MatchOutcome::Won("c".to_string())));
        assert_eq!(second, None);
        assert_eq!(count(&ctx, |e| matches!(e, MatchEvent::MatchWon { .. })), 1);
        assert_eq!(count(&ctx, |e| matches!(e, MatchEvent::AvatarDied { .. })), 2);
        assert!(!ctrl.timer(TimerKind::Hazard).is_active());
        assert!(
            ctx.pending_events()
                .contains(&MatchEvent::MatchWon {
                    participant: "c".to_string(),
                    starting_participants: 3
                })
        );
    }

    #[test]
    fn everyone_dead_is_a_draw() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", false);
        let b = join(&mut ctrl, &mut ctx, "b", false);
        ctrl.start_rounds(&mut ctx);
        ctx.world.kill(a);
        ctx.world.kill(b);
        assert_eq!(ctrl.on_avatar_died(&mut ctx, a, DamageCause::Other), Some(MatchOutcome::Drawn));
        assert_eq!(ctrl.on_avatar_died(&mut ctx, b, DamageCause::Other), None);
    }

    #[test]
    fn deaths_in_lobby_do_not_decide_the_match() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", false);
        join(&mut ctrl, &mut ctx, "b", false);
        ctx.world.kill(a);
        assert_eq!(ctrl.on_avatar_died(&mut ctx, a, DamageCause::Other), None);
        assert!(!ctrl.is_match_decided());
    }

    #[test]
    fn projectile_kills_are_credited_to_the_owner() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", false);
        let b = join(&mut ctrl, &mut ctx, "b", false);
        join(&mut ctrl, &mut ctx, "c", false);
        ctrl.start_rounds(&mut ctx);

        ctx.world.kill(a);
        ctrl.on_avatar_died(&mut ctx, a, DamageCause::Projectile { owner: Some("b".to_string()) });
        ctx.world.kill(b);
        ctrl.on_avatar_died(&mut ctx, b, DamageCause::Projectile { owner: Some("b".to_string()) });
        assert_eq!(ctx.registry.get("b").unwrap().kills, 1);
        assert_eq!(ctx.registry.get("a").unwrap().kills, 0);
    }

    #[test]
    fn unknown_avatar_death_is_ignored() {
        let (mut ctrl, mut ctx) = lobby();
        assert_eq!(ctrl.on_avatar_died(&mut ctx, AvatarRef(999), DamageCause::Hazard), None);
        assert!(ctx.pending_events().is_empty());
    }

    #[test]
    fn environmental_damage_only_counts_in_gameplay() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", false);
        assert_eq!(ctrl.on_avatar_damaged(&ctx, a, &DamageCause::Fall), DamageVerdict::Cancel);
        assert_eq!(ctrl.on_avatar_damaged(&ctx, a, &DamageCause::Drowning), DamageVerdict::Cancel);
        assert_eq!(ctrl.on_avatar_damaged(&ctx, a, &DamageCause::Hazard), DamageVerdict::Allow);
        ctrl.start_rounds(&mut ctx);
        assert_eq!(ctrl.on_avatar_damaged(&ctx, a, &DamageCause::Fall), DamageVerdict::Allow);
    }

    #[test]
    fn dispose_cancels_everything_once() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", false);
        let b = join(&mut ctrl, &mut ctx, "b", false);
        ctx.world.kill(b);
        ctrl.start_rounds(&mut ctx);
        assert!(ctrl.active_timer_count() > 0);

        assert!(ctrl.dispose(&mut ctx));
        assert!(!ctrl.dispose(&mut ctx));
        assert_eq!(ctrl.active_timer_count(), 0);
        assert_eq!(ctx.world.removed, vec![a, b]);
        assert!(ctx.registry.get("a").unwrap().avatar.is_none());
        assert!(ctx.registry.get("b").unwrap().avatar.is_none());

        let rounds = ctrl.rounds_fired();
        advance(&mut ctrl, &mut ctx, 1000.0);
        assert_eq!(ctrl.rounds_fired(), rounds);
    }

    #[test]
    fn spawn_places_avatar_inside_and_announces_it() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", false);
        let pos = ctx.world.avatar(a).unwrap().position;
        assert!(ctrl.arena().is_inside(&pos));
        assert!((pos.y - 94.0).abs() < f64::EPSILON);
        assert!(ctrl.spawn_avatar(&mut ctx, "a").is_none());
        assert!(ctrl.spawn_avatar(&mut ctx, "nobody").is_none());
        assert_eq!(
            count(&ctx, |e| matches!(e, MatchEvent::ParticipantJoined { number: 1, .. })),
            1
        );
    }

    #[test]
    fn relocate_moves_a_living_avatar() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", false);
        assert!(ctrl.relocate_avatar(&mut ctx, "a"));
        assert_eq!(ctx.world.teleports.len(), 1);
        assert!(ctrl.arena().is_inside(&ctx.world.teleports[0].1));
        ctx.world.kill(a);
        assert!(!ctrl.relocate_avatar(&mut ctx, "a"));
    }

    #[test]
    fn teleport_respects_cooldown_and_disarms() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", true);
        let centre = ctrl.arena().origin().offset(0.0, 0.0, 20.0);
        ctx.world.teleport_avatar(a, centre);
        ctx.world.teleports.clear();

        assert!(ctrl.special_teleport(&mut ctx, "a", Some(0)));
        let (_, to) = ctx.world.teleports[0];
        let moved = to.z - centre.z;
        assert!((2.5..=10.5).contains(&moved), "moved {moved}");
        assert!((to.y - 66.0).abs() < f64::EPSILON);
        let p = ctx.registry.get("a").unwrap();
        assert!(!p.aim.armed);
        assert_eq!(p.ability_ready_at, secs(15.0));

        assert!(!ctrl.special_teleport(&mut ctx, "a", Some(0)));
        ctx.set_now(secs(15.0));
        assert!(ctrl.special_teleport(&mut ctx, "a", Some(180)));
        assert_eq!(ctx.world.teleports.len(), 2);
    }

    #[test]
    fn teleport_out_of_the_arena_is_rejected_without_cooldown() {
        let (mut ctrl, mut ctx) = lobby();
        let a = join(&mut ctrl, &mut ctx, "a", true);
        // Standing on the north edge and heading north (towards -Z).
        let edge = ctrl.arena().origin();
        ctx.world.teleport_avatar(a, edge);
        ctx.world.teleports.clear();

        assert!(!ctrl.special_teleport(&mut ctx, "a", Some(180)));
        assert!(ctx.world.teleports.is_empty());
        let p = ctx.registry.get("a").unwrap();
        assert!(p.aim.armed);
        assert!(p.can_use_ability(ctx.now()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut ctx = MatchContext::new(FakeWorld::new());
        let config = ArenaConfig {
            depth: 0,
            ..ArenaConfig::default()
        };
        let err = ArenaController::new(1, config, &mut ctx, StdRng::seed_from_u64(1)).err();
        assert!(matches!(err, Some(ArenaError::InvalidConfig(_))));
    }

    #[test]
    fn placement_failure_surfaces() {
        let mut ctx = MatchContext::new(FakeWorld::new());
        ctx.world.reject_anchors = true;
        let err = ArenaController::new(1, ArenaConfig::default(), &mut ctx, StdRng::seed_from_u64(1)).err();
        assert_eq!(err, Some(ArenaError::PlacementExhausted { attempts: 1000 }));
    }
}
