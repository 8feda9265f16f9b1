use std::collections::{BTreeMap, HashMap};

use royale_arena::arena::heading_offset;
use royale_core::events::{DamageCause, WorldEvent};
use royale_core::geometry::{Point, RegionBox};
use royale_core::participant::{AvatarRef, Shot};
use royale_core::world::{TerrainCategory, WorldError, WorldPort};

use crate::config::SimWorldConfig;

/// Lowest surface height generated.
pub const BASE_SURFACE: f64 = 62.0;
/// Surface heights vary by up to this many blocks.
const SURFACE_VARIATION: u64 = 8;
/// Side length of a terrain patch sharing one category.
const TERRAIN_PATCH: i64 = 64;
/// Side length of a column group sharing one surface height.
const SURFACE_PATCH: i64 = 16;
/// Falling speed of avatars and hazards, blocks/second.
pub const FALL_SPEED: f64 = 20.0;
/// Horizontal projectile speed at full power on a flat shot, blocks/second.
pub const PROJECTILE_SPEED: f64 = 50.0;
/// Starting tick rate sample before the loop reports real measurements.
const NOMINAL_TICK_RATE: f64 = 20.0;

/// What produced a pending damage request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageSource {
    /// A projectile launched by this avatar.
    Projectile(AvatarRef),
    Hazard,
    Fall,
}

/// Damage the simulation wants to deal. The caller asks the match whether
/// to allow it before calling [`SimWorld::apply_damage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRequest {
    pub avatar: AvatarRef,
    pub source: DamageSource,
    pub amount: f64,
}

#[derive(Debug, Clone)]
struct SimAvatar {
    owner: String,
    position: Point,
    /// Height the current fall started from.
    fall_from: f64,
    health: f64,
    alive: bool,
}

#[derive(Debug, Clone)]
struct Projectile {
    source: AvatarRef,
    target: Point,
    detonate_at: f64,
}

#[derive(Debug, Clone)]
struct Hazard {
    position: Point,
    lands_at: f64,
}

/// Deterministic stand-in for a real game world. Terrain is generated from
/// a seed, regions take a fixed time to load, avatars fall under a constant
/// speed and projectiles detonate where their fuse runs out.
pub struct SimWorld {
    config: SimWorldConfig,
    seed: u64,
    now: f64,
    /// Region coordinates to the time they finish loading.
    regions: HashMap<(i64, i64), f64>,
    avatars: BTreeMap<AvatarRef, SimAvatar>,
    projectiles: Vec<Projectile>,
    hazards: Vec<Hazard>,
    tick_rate: f64,
    next_avatar: u64,
}

impl SimWorld {
    pub fn new(config: SimWorldConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            now: 0.0,
            regions: HashMap::new(),
            avatars: BTreeMap::new(),
            projectiles: Vec::new(),
            hazards: Vec::new(),
            tick_rate: NOMINAL_TICK_RATE,
            next_avatar: 1,
        }
    }

    /// Feed the measured loop rate back so readiness checks see real load.
    pub fn set_tick_rate_sample(&mut self, rate: f64) {
        self.tick_rate = rate;
    }

    pub fn live_avatar_count(&self) -> usize {
        self.avatars.values().filter(|a| a.alive).count()
    }

    pub fn health_of(&self, avatar: AvatarRef) -> Option<f64> {
        self.avatars.get(&avatar).map(|a| a.health)
    }

    pub fn pending_projectiles(&self) -> usize {
        self.projectiles.len()
    }

    pub fn tracked_regions(&self) -> usize {
        self.regions.len()
    }

    /// Avatars the world still stores, dead or alive.
    pub fn stored_avatars(&self) -> usize {
        self.avatars.len()
    }

    /// Advance the simulation by `dt` seconds and collect the damage it
    /// produced: landings, detonations, and hazard impacts.
    pub fn step(&mut self, dt: f64) -> Vec<DamageRequest> {
        self.now += dt;
        let mut damage = Vec::new();
        self.step_falls(dt, &mut damage);

        let now = self.now;
        let (detonating, flying): (Vec<_>, Vec<_>) = std::mem::take(&mut self.projectiles)
            .into_iter()
            .partition(|p| p.detonate_at <= now);
        self.projectiles = flying;
        for projectile in detonating {
            let lethal = self.config.avatar_health;
            for avatar in self.avatars_near(&projectile.target, self.config.blast_radius) {
                damage.push(DamageRequest {
                    avatar,
                    source: DamageSource::Projectile(projectile.source),
                    amount: lethal,
                });
            }
        }

        let (landed, falling): (Vec<_>, Vec<_>) = std::mem::take(&mut self.hazards)
            .into_iter()
            .partition(|h| h.lands_at <= now);
        self.hazards = falling;
        for hazard in landed {
            for avatar in self.avatars_near(&hazard.position, self.config.hazard_radius) {
                damage.push(DamageRequest {
                    avatar,
                    source: DamageSource::Hazard,
                    amount: self.config.avatar_health,
                });
            }
        }
        damage
    }

    fn step_falls(&mut self, dt: f64, damage: &mut Vec<DamageRequest>) {
        let safe = self.config.safe_fall_height;
        let surfaces: Vec<(AvatarRef, f64)> = self
            .avatars
            .iter()
            .filter(|(_, a)| a.alive)
            .map(|(&r, a)| (r, self.highest_surface_at(a.position.block_x(), a.position.block_z())))
            .collect();

        for (avatar_ref, surface) in surfaces {
            let Some(avatar) = self.avatars.get_mut(&avatar_ref) else {
                continue;
            };
            if avatar.position.y <= surface {
                avatar.position.y = surface;
                avatar.fall_from = surface;
                continue;
            }
            avatar.position.y = (avatar.position.y - FALL_SPEED * dt).max(surface);
            if avatar.position.y > surface {
                continue;
            }
            let drop = avatar.fall_from - surface;
            avatar.fall_from = surface;
            if drop > safe {
                damage.push(DamageRequest {
                    avatar: avatar_ref,
                    source: DamageSource::Fall,
                    amount: drop - safe,
                });
            }
        }
    }

    fn avatars_near(&self, center: &Point, radius: f64) -> Vec<AvatarRef> {
        self.avatars
            .iter()
            .filter(|(_, a)| a.alive && a.position.horizontal_distance(center) <= radius)
            .map(|(&r, _)| r)
            .collect()
    }

    /// Deal damage the match allowed. Returns the death event if this hit
    /// killed a living avatar.
    pub fn apply_damage(&mut self, avatar: AvatarRef, amount: f64, cause: DamageCause) -> Option<WorldEvent> {
        let target = self.avatars.get_mut(&avatar).filter(|a| a.alive)?;
        target.health -= amount;
        if target.health > 0.0 {
            return None;
        }
        target.alive = false;
        tracing::debug!(%avatar, owner = %target.owner, ?cause, "Avatar destroyed");
        Some(WorldEvent::AvatarDied { avatar, cause })
    }

    fn cell_hash(&self, a: i64, b: i64) -> u64 {
        splitmix64(self.seed ^ splitmix64((a as u64) ^ splitmix64(b as u64)))
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Where a shot detonates. Headings follow teleports: 0 is the arena top
/// (+Z) and 90 its right side (-X). Elevation is negative for up; flat shots
/// travel furthest.
pub fn landing_point(from: Point, shot: &Shot) -> Point {
    let pitch = f64::from(-shot.elevation).to_radians();
    let speed = PROJECTILE_SPEED * f64::from(shot.power) / 100.0 * pitch.cos();
    let (dx, dz) = heading_offset(shot.direction, speed * shot.lifetime);
    from.offset(dx, 0.0, dz)
}

impl WorldPort for SimWorld {
    fn place_arena_anchor(&mut self, candidate: Point) -> Option<Point> {
        // A new arena starts loading from scratch.
        self.regions.clear();
        let surface = self.highest_surface_at(candidate.block_x(), candidate.block_z());
        Some(candidate.with_y(surface))
    }

    fn sample_terrain_category(&self, point: Point) -> TerrainCategory {
        let h = self.cell_hash(
            point.block_x().div_euclid(TERRAIN_PATCH),
            point.block_z().div_euclid(TERRAIN_PATCH),
        );
        match h % 10 {
            0 => TerrainCategory::Ocean,
            1 => TerrainCategory::DeepOcean,
            2 => TerrainCategory::Forest,
            3 => TerrainCategory::Desert,
            4 => TerrainCategory::Savanna,
            5 => TerrainCategory::Taiga,
            6 => TerrainCategory::BirchForest,
            _ => TerrainCategory::Plains,
        }
    }

    fn are_regions_loaded(&mut self, regions: &RegionBox) -> bool {
        let now = self.now;
        let ready_after = self.config.region_load_secs;
        let mut all_loaded = true;
        for region in regions.regions() {
            let ready_at = *self.regions.entry(region).or_insert(now + ready_after);
            if ready_at > now {
                all_loaded = false;
            }
        }
        all_loaded
    }

    fn highest_surface_at(&self, x: i64, z: i64) -> f64 {
        let h = self.cell_hash(x.div_euclid(SURFACE_PATCH), z.div_euclid(SURFACE_PATCH));
        BASE_SURFACE + (h % SURFACE_VARIATION) as f64
    }

    fn spawn_avatar(&mut self, at: Point, owner_name: &str) -> AvatarRef {
        let avatar = AvatarRef(self.next_avatar);
        self.next_avatar += 1;
        self.avatars.insert(
            avatar,
            SimAvatar {
                owner: owner_name.to_string(),
                position: at,
                fall_from: at.y,
                health: self.config.avatar_health,
                alive: true,
            },
        );
        avatar
    }

    fn teleport_avatar(&mut self, avatar: AvatarRef, to: Point) {
        if let Some(a) = self.avatars.get_mut(&avatar).filter(|a| a.alive) {
            a.position = to;
            a.fall_from = to.y;
        }
    }

    fn remove_avatar(&mut self, avatar: AvatarRef) {
        self.avatars.remove(&avatar);
        self.projectiles.retain(|p| p.source != avatar);
    }

    fn launch_projectile(&mut self, avatar: AvatarRef, shot: &Shot) -> Result<(), WorldError> {
        let from = self
            .avatars
            .get(&avatar)
            .filter(|a| a.alive)
            .map(|a| a.position)
            .ok_or(WorldError::UnknownAvatar(avatar))?;
        self.projectiles.push(Projectile {
            source: avatar,
            target: landing_point(from, shot),
            detonate_at: self.now + shot.lifetime,
        });
        Ok(())
    }

    fn spawn_hazard(&mut self, at: Point) {
        let surface = self.highest_surface_at(at.block_x(), at.block_z());
        let fall_time = ((at.y - surface) / FALL_SPEED).max(0.0);
        self.hazards.push(Hazard {
            position: at,
            lands_at: self.now + fall_time,
        });
    }

    fn avatar_position(&self, avatar: AvatarRef) -> Option<Point> {
        self.avatars.get(&avatar).map(|a| a.position)
    }

    fn is_avatar_alive(&self, avatar: AvatarRef) -> bool {
        self.avatars.get(&avatar).is_some_and(|a| a.alive)
    }

    fn current_tick_rate_sample(&self) -> f64 {
        self.tick_rate
    }
}
