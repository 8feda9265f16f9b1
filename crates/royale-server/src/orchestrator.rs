use std::collections::HashSet;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use royale_arena::ArenaController;
use royale_arena::config::ArenaConfig;
use royale_arena::error::ArenaError;
use royale_arena::timer::Timer;
use royale_core::context::MatchContext;
use royale_core::events::{DamageVerdict, MatchEvent, WorldEvent};
use royale_core::geometry::Point;
use royale_core::participant::{AvatarColor, AvatarRef, ParticipantId};
use royale_core::phase::Phase;
use royale_core::world::WorldPort;

use crate::commands::{ChatCommand, ChatMessage};

/// Serializable match snapshot for the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchStatus {
    pub phase: Phase,
    pub arena_id: Option<u64>,
    pub origin: Option<Point>,
    pub now_secs: f64,
    pub living: usize,
    pub starting_participants: usize,
    pub rounds_fired: u32,
    pub round_interval_secs: f64,
    pub next_round_in_secs: Option<f64>,
    pub sudden_death: bool,
    pub reset_pending: bool,
    pub participants: Vec<ParticipantStatus>,
    /// Set once the match loop has stopped.
    pub stopped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantStatus {
    pub id: ParticipantId,
    pub name: String,
    pub color: AvatarColor,
    pub alive: bool,
    pub armed: bool,
    pub kills: u32,
}

/// Sequences matches: owns the match context, the live arena, and the
/// reset timer between matches. Chat commands and world events enter here.
pub struct MatchOrchestrator<W: WorldPort> {
    ctx: MatchContext<W>,
    arena: Option<ArenaController>,
    arena_config: ArenaConfig,
    reset: Timer,
    reset_delay: Duration,
    admins: HashSet<String>,
    next_arena_id: u64,
    rng: StdRng,
}

impl<W: WorldPort> MatchOrchestrator<W> {
    pub fn new(
        world: W,
        arena_config: ArenaConfig,
        reset_delay: Duration,
        admins: impl IntoIterator<Item = String>,
        rng: StdRng,
    ) -> Self {
        Self {
            ctx: MatchContext::new(world),
            arena: None,
            arena_config,
            reset: Timer::new(),
            reset_delay,
            admins: admins.into_iter().map(|a| a.to_lowercase()).collect(),
            next_arena_id: 1,
            rng,
        }
    }

    pub fn ctx(&self) -> &MatchContext<W> {
        &self.ctx
    }

    pub fn world(&self) -> &W {
        &self.ctx.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.ctx.world
    }

    pub fn arena(&self) -> Option<&ArenaController> {
        self.arena.as_ref()
    }

    pub fn reset_pending(&self) -> bool {
        self.reset.is_active()
    }

    /// Tear down the current arena (if any), forget every participant, and
    /// build a fresh arena. After the first match this goes through
    /// `PreGameplay` so nobody can join until the new arena is ready.
    pub fn start_new_game(&mut self) -> Result<(), ArenaError> {
        if self.ctx.phase() != Phase::CreatingArena {
            self.ctx.begin_reset();
        }
        self.reset.cancel();
        if let Some(mut old) = self.arena.take() {
            old.dispose(&mut self.ctx);
        }
        self.ctx.registry.remove_all();

        let id = self.next_arena_id;
        self.next_arena_id += 1;
        let arena_rng = StdRng::seed_from_u64(self.rng.random());
        match ArenaController::new(id, self.arena_config.clone(), &mut self.ctx, arena_rng) {
            Ok(arena) => {
                self.arena = Some(arena);
                Ok(())
            },
            Err(e) => {
                tracing::error!(arena = id, "Could not create arena: {e}");
                Err(e)
            },
        }
    }

    /// Advance the match clock and fire whatever is due.
    pub fn tick(&mut self, now: Duration) -> Result<(), ArenaError> {
        self.ctx.set_now(now);
        if self.reset.is_due(self.ctx.now()) {
            self.reset.consume(self.ctx.now());
            tracing::info!("Starting next match");
            self.start_new_game()?;
        }
        if let Some(arena) = self.arena.as_mut() {
            arena.tick(&mut self.ctx);
        }
        Ok(())
    }

    fn is_admin(&self, sender: &str, admin_flag: bool) -> bool {
        admin_flag || self.admins.contains(&sender.to_lowercase())
    }

    /// Apply one chat line. Unrecognised or unauthorised input is dropped.
    /// Errors only when an admin-requested arena could not be built.
    pub fn handle_chat(&mut self, message: &ChatMessage, admin_flag: bool) -> Result<(), ArenaError> {
        let Some(command) = ChatCommand::parse(&message.text) else {
            tracing::trace!(sender = %message.sender, "Ignoring non-command chat");
            return Ok(());
        };
        if command.requires_admin() && !self.is_admin(&message.sender, admin_flag) {
            tracing::debug!(sender = %message.sender, ?command, "Admin command from non-admin");
            return Ok(());
        }
        let sender = message.sender.to_lowercase();
        tracing::debug!(%sender, ?command, "Chat command");

        match command {
            ChatCommand::Join { color } => self.join(&sender, message, color),
            ChatCommand::Direction(delta) => {
                if let Some(p) = self.ctx.registry.get_mut(&sender) {
                    p.aim.add_direction(delta);
                }
            },
            ChatCommand::Elevation(delta) => {
                if let Some(p) = self.ctx.registry.get_mut(&sender) {
                    p.aim.add_elevation(delta);
                }
            },
            ChatCommand::Power(delta) => {
                if let Some(p) = self.ctx.registry.get_mut(&sender) {
                    p.aim.add_power(delta);
                }
            },
            ChatCommand::Lifetime(delta) => {
                if let Some(p) = self.ctx.registry.get_mut(&sender) {
                    p.aim.add_lifetime(delta);
                }
            },
            ChatCommand::Aim(params) => {
                if let Some(p) = self.ctx.registry.get_mut(&sender) {
                    p.aim.set_full(params);
                }
            },
            ChatCommand::Cancel => {
                if self.ctx.registry.is_alive(&sender, &self.ctx.world)
                    && let Some(p) = self.ctx.registry.get_mut(&sender)
                {
                    p.aim.disarm();
                }
            },
            ChatCommand::Relocate => {
                if self.ctx.phase() == Phase::Lobby
                    && let Some(arena) = self.arena.as_mut()
                {
                    arena.relocate_avatar(&mut self.ctx, &sender);
                }
            },
            ChatCommand::Teleport { direction } => {
                if let Some(arena) = self.arena.as_mut() {
                    arena.special_teleport(&mut self.ctx, &sender, direction);
                }
            },
            ChatCommand::StartRounds => {
                if let Some(arena) = self.arena.as_mut() {
                    arena.start_rounds(&mut self.ctx);
                }
            },
            ChatCommand::NewArena => self.start_new_game()?,
            ChatCommand::Hazard => {
                if let Some(arena) = self.arena.as_mut() {
                    arena.start_sudden_death(&mut self.ctx);
                }
            },
        }
        Ok(())
    }

    fn join(&mut self, sender: &str, message: &ChatMessage, named: Option<AvatarColor>) {
        if !self.ctx.can_join() {
            return;
        }
        let Some(arena) = self.arena.as_mut() else {
            return;
        };
        let color = named
            .or_else(|| message.chat_color.as_deref().and_then(AvatarColor::from_chat_hex))
            .unwrap_or_else(|| AvatarColor::random(&mut self.rng));

        let participant = self
            .ctx
            .registry
            .get_or_create(sender, message.display_name.as_deref());
        participant.color = color;
        if participant.can_place_avatar() {
            arena.spawn_avatar(&mut self.ctx, sender);
        }
    }

    /// Feed a world-reported event to the arena. Damage events return the
    /// verdict the world should apply.
    pub fn handle_world_event(&mut self, event: WorldEvent) -> Option<DamageVerdict> {
        let arena = self.arena.as_mut()?;
        match event {
            WorldEvent::AvatarDied { avatar, cause } => {
                if arena.on_avatar_died(&mut self.ctx, avatar, cause).is_some() {
                    self.schedule_reset();
                }
                None
            },
            WorldEvent::AvatarDamaged { avatar, cause } => {
                Some(arena.on_avatar_damaged(&self.ctx, avatar, &cause))
            },
        }
    }

    /// At most one reset is ever pending.
    fn schedule_reset(&mut self) {
        if self.reset.is_active() {
            return;
        }
        let at = self.ctx.now() + self.reset_delay;
        self.reset.schedule_once(at, 0);
        tracing::info!(in_secs = self.reset_delay.as_secs_f64(), "Match over, reset scheduled");
    }

    /// Participant id owning an avatar, for attributing projectile damage.
    pub fn owner_of(&self, avatar: AvatarRef) -> Option<ParticipantId> {
        self.ctx.registry.owner_of(avatar).map(|p| p.id.clone())
    }

    pub fn drain_events(&mut self) -> Vec<MatchEvent> {
        self.ctx.drain_events()
    }

    pub fn status(&self) -> MatchStatus {
        let now = self.ctx.now();
        let world = &self.ctx.world;
        let participants = self
            .ctx
            .registry
            .iter()
            .map(|p| ParticipantStatus {
                id: p.id.clone(),
                name: p.name().to_string(),
                color: p.color,
                alive: p.avatar.is_some_and(|a| world.is_avatar_alive(a)),
                armed: p.aim.armed,
                kills: p.kills,
            })
            .collect();
        let arena = self.arena.as_ref();
        MatchStatus {
            phase: self.ctx.phase(),
            arena_id: arena.map(ArenaController::id),
            origin: arena.map(|a| a.arena().origin()),
            now_secs: now.as_secs_f64(),
            living: self.ctx.registry.living_count(world),
            starting_participants: arena.map_or(0, ArenaController::starting_participants),
            rounds_fired: arena.map_or(0, ArenaController::rounds_fired),
            round_interval_secs: arena.map_or(0.0, |a| a.round_interval().as_secs_f64()),
            next_round_in_secs: arena
                .filter(|_| self.ctx.phase() == Phase::Gameplay)
                .and_then(ArenaController::next_round_start)
                .map(|at| at.saturating_sub(now).as_secs_f64()),
            sudden_death: arena.is_some_and(ArenaController::is_sudden_death),
            reset_pending: self.reset.is_active(),
            participants,
            stopped: false,
        }
    }
}
