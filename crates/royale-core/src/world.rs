use serde::{Deserialize, Serialize};

use crate::geometry::{Point, RegionBox};
use crate::participant::{AvatarRef, Shot};

/// Coarse terrain classification used to validate arena locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainCategory {
    Plains,
    Desert,
    Savanna,
    Forest,
    BirchForest,
    Taiga,
    Jungle,
    BambooJungle,
    Swamp,
    Mountains,
    Beach,
    River,
    Ocean,
    ColdOcean,
    DeepOcean,
    DeepColdOcean,
    LukewarmOcean,
    DeepLukewarmOcean,
    WarmOcean,
    FrozenOcean,
}

impl TerrainCategory {
    /// Categories that make a poor arena: mostly water or dense canopy.
    /// Frozen ocean stays allowed for variety.
    pub const DEFAULT_DISALLOWED: [TerrainCategory; 10] = [
        TerrainCategory::Ocean,
        TerrainCategory::Jungle,
        TerrainCategory::BirchForest,
        TerrainCategory::BambooJungle,
        TerrainCategory::ColdOcean,
        TerrainCategory::DeepColdOcean,
        TerrainCategory::DeepLukewarmOcean,
        TerrainCategory::DeepOcean,
        TerrainCategory::WarmOcean,
        TerrainCategory::LukewarmOcean,
    ];
}

/// Failure reported by the world runtime for a single side effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("{0} does not exist in the world")]
    UnknownAvatar(AvatarRef),
    #[error("world rejected the request: {0}")]
    Rejected(String),
}

/// The hosting world runtime. Spawns and moves in-world objects and answers
/// spatial queries. Avatar liveness is owned here and must be re-queried,
/// never cached.
pub trait WorldPort {
    /// Snap a candidate arena anchor onto the world, or reject it.
    fn place_arena_anchor(&mut self, candidate: Point) -> Option<Point>;

    fn sample_terrain_category(&self, point: Point) -> TerrainCategory;

    /// Whether every region in the box has finished loading.
    fn are_regions_loaded(&mut self, regions: &RegionBox) -> bool;

    /// Height of the highest solid surface at a block column.
    fn highest_surface_at(&self, x: i64, z: i64) -> f64;

    fn spawn_avatar(&mut self, at: Point, owner_name: &str) -> AvatarRef;

    fn teleport_avatar(&mut self, avatar: AvatarRef, to: Point);

    fn remove_avatar(&mut self, avatar: AvatarRef);

    fn launch_projectile(&mut self, avatar: AvatarRef, shot: &Shot) -> Result<(), WorldError>;

    fn spawn_hazard(&mut self, at: Point);

    /// Current position of a placed avatar.
    fn avatar_position(&self, avatar: AvatarRef) -> Option<Point>;

    /// Placed, not destroyed, and not already queued for removal.
    fn is_avatar_alive(&self, avatar: AvatarRef) -> bool;

    /// Recent average simulation tick rate (ticks per second).
    fn current_tick_rate_sample(&self) -> f64;
}
