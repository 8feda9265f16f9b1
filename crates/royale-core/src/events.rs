use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::participant::{AvatarRef, ParticipantId};
use crate::phase::Phase;

/// Why an avatar took damage or died.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DamageCause {
    /// Hit by a projectile. `owner` is the participant that launched it, when known.
    Projectile { owner: Option<ParticipantId> },
    Hazard,
    Fall,
    Drowning,
    Other,
}

impl DamageCause {
    /// Environmental damage that only counts once gameplay has started.
    pub fn is_environmental(&self) -> bool {
        matches!(self, DamageCause::Fall | DamageCause::Drowning)
    }
}

/// Domain events reported by the world runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    AvatarDied { avatar: AvatarRef, cause: DamageCause },
    AvatarDamaged { avatar: AvatarRef, cause: DamageCause },
}

/// Whether the world should apply a damage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageVerdict {
    Allow,
    Cancel,
}

/// Events emitted for presentation layers (HUD, scoreboard, chat broadcasts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    PhaseChanged {
        old: Phase,
        new: Phase,
    },
    ArenaReady {
        arena_id: u64,
        origin: Point,
    },
    ParticipantJoined {
        participant: ParticipantId,
        number: usize,
        relative_x: i64,
        relative_z: i64,
    },
    RoundFired {
        round_index: u32,
        launched: usize,
    },
    HazardEscalated {
        arena_id: u64,
    },
    AvatarDied {
        participant: ParticipantId,
        cause: DamageCause,
        remaining: usize,
    },
    MatchWon {
        participant: ParticipantId,
        starting_participants: usize,
    },
    MatchDrawn {
        starting_participants: usize,
    },
}

/// How a match concluded, reported back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Won(ParticipantId),
    Drawn,
}
