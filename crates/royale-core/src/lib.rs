pub mod context;
pub mod events;
pub mod geometry;
pub mod parser;
pub mod participant;
pub mod phase;
pub mod registry;
pub mod world;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::cell::Cell;
    use std::collections::{BTreeMap, HashSet};

    use crate::geometry::{Point, RegionBox};
    use crate::participant::{AvatarRef, Shot};
    use crate::world::{TerrainCategory, WorldError, WorldPort};

    type TerrainFn = Box<dyn Fn(Point) -> TerrainCategory + Send>;

    #[derive(Debug, Clone)]
    pub struct FakeAvatar {
        pub owner: String,
        pub position: Point,
        pub alive: bool,
    }

    /// Scriptable in-memory world that records every side effect.
    ///
    /// Defaults: all terrain is plains, regions are loaded, the tick rate is
    /// a healthy 20, and the surface sits at y = 64.
    pub struct FakeWorld {
        pub terrain: TerrainFn,
        pub reject_anchors: bool,
        pub regions_loaded: bool,
        pub tick_rate: f64,
        pub surface_height: f64,
        pub anchor_calls: usize,
        pub terrain_samples: Cell<usize>,
        pub region_probes: usize,
        pub launches: Vec<(AvatarRef, Shot)>,
        pub hazards: Vec<Point>,
        pub teleports: Vec<(AvatarRef, Point)>,
        pub removed: Vec<AvatarRef>,
        pub failing_launches: HashSet<AvatarRef>,
        avatars: BTreeMap<AvatarRef, FakeAvatar>,
        next_avatar: u64,
    }

    impl Default for FakeWorld {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FakeWorld {
        pub fn new() -> Self {
            Self {
                terrain: Box::new(|_| TerrainCategory::Plains),
                reject_anchors: false,
                regions_loaded: true,
                tick_rate: 20.0,
                surface_height: 64.0,
                anchor_calls: 0,
                terrain_samples: Cell::new(0),
                region_probes: 0,
                launches: Vec::new(),
                hazards: Vec::new(),
                teleports: Vec::new(),
                removed: Vec::new(),
                failing_launches: HashSet::new(),
                avatars: BTreeMap::new(),
                next_avatar: 1,
            }
        }

        /// Replace the terrain classifier.
        pub fn with_terrain(
            mut self,
            classify: impl Fn(Point) -> TerrainCategory + Send + 'static,
        ) -> Self {
            self.terrain = Box::new(classify);
            self
        }

        /// Destroy an avatar as the world would (hazard, projectile, fall).
        pub fn kill(&mut self, avatar: AvatarRef) {
            if let Some(a) = self.avatars.get_mut(&avatar) {
                a.alive = false;
            }
        }

        pub fn avatar(&self, avatar: AvatarRef) -> Option<&FakeAvatar> {
            self.avatars.get(&avatar)
        }

        pub fn live_avatar_count(&self) -> usize {
            self.avatars.values().filter(|a| a.alive).count()
        }
    }

    impl WorldPort for FakeWorld {
        fn place_arena_anchor(&mut self, candidate: Point) -> Option<Point> {
            self.anchor_calls += 1;
            if self.reject_anchors {
                None
            } else {
                Some(candidate)
            }
        }

        fn sample_terrain_category(&self, point: Point) -> TerrainCategory {
            self.terrain_samples.set(self.terrain_samples.get() + 1);
            (self.terrain)(point)
        }

        fn are_regions_loaded(&mut self, _regions: &RegionBox) -> bool {
            self.region_probes += 1;
            self.regions_loaded
        }

        fn highest_surface_at(&self, _x: i64, _z: i64) -> f64 {
            self.surface_height
        }

        fn spawn_avatar(&mut self, at: Point, owner_name: &str) -> AvatarRef {
            let avatar = AvatarRef(self.next_avatar);
            self.next_avatar += 1;
            self.avatars.insert(
                avatar,
                FakeAvatar {
                    owner: owner_name.to_string(),
                    position: at,
                    alive: true,
                },
            );
            avatar
        }

        fn teleport_avatar(&mut self, avatar: AvatarRef, to: Point) {
            self.teleports.push((avatar, to));
            if let Some(a) = self.avatars.get_mut(&avatar) {
                a.position = to;
            }
        }

        fn remove_avatar(&mut self, avatar: AvatarRef) {
            self.removed.push(avatar);
            if let Some(a) = self.avatars.get_mut(&avatar) {
                a.alive = false;
            }
        }

        fn launch_projectile(&mut self, avatar: AvatarRef, shot: &Shot) -> Result<(), WorldError> {
            if self.failing_launches.contains(&avatar) {
                return Err(WorldError::Rejected("scripted launch failure".to_string()));
            }
            if !self.avatars.contains_key(&avatar) {
                return Err(WorldError::UnknownAvatar(avatar));
            }
            self.launches.push((avatar, *shot));
            Ok(())
        }

        fn spawn_hazard(&mut self, at: Point) {
            self.hazards.push(at);
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
}
