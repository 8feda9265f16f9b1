use rand::Rng;

use royale_core::geometry::{Point, RegionBox};
use royale_core::world::WorldPort;

use crate::config::ArenaConfig;
use crate::error::ArenaError;

/// The rectangular play area. `origin` is the top-centre: the arena spans
/// `half_width` blocks either side of it on X and `depth` blocks south of it on Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    origin: Point,
    half_width: i64,
    depth: i64,
}

impl Arena {
    pub fn new(origin: Point, half_width: i64, depth: i64) -> Self {
        Self {
            origin,
            half_width,
            depth,
        }
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn half_width(&self) -> i64 {
        self.half_width
    }

    pub fn depth(&self) -> i64 {
        self.depth
    }

    /// Full east-west span.
    pub fn width(&self) -> i64 {
        self.half_width * 2
    }

    pub fn west_x(&self) -> i64 {
        self.origin.block_x() - self.half_width
    }

    pub fn east_x(&self) -> i64 {
        self.origin.block_x() + self.half_width
    }

    pub fn north_z(&self) -> i64 {
        self.origin.block_z()
    }

    pub fn south_z(&self) -> i64 {
        self.origin.block_z() + self.depth
    }

    /// Inclusive bounds check on block coordinates.
    pub fn is_inside(&self, point: &Point) -> bool {
        let (bx, bz) = (point.block_x(), point.block_z());
        (self.west_x()..=self.east_x()).contains(&bx) && (self.north_z()..=self.south_z()).contains(&bz)
    }

    /// Arena-local coordinates in `[0, width] x [0, depth]` for points inside.
    /// X counts from the east edge so the view matches the audience camera.
    pub fn relative_position(&self, point: &Point) -> (i64, i64) {
        let x = self.width() - (point.block_x() - self.west_x());
        let z = point.block_z() - self.north_z();
        (x, z)
    }

    /// Which of the nine equal sectors the point falls in, in words.
    pub fn sector_name(&self, point: &Point) -> &'static str {
        let (x, z) = self.relative_position(point);
        let third_x = self.width() / 3;
        let third_z = self.depth / 3;
        let column = if x < third_x {
            0
        } else if x < 2 * third_x {
            1
        } else {
            2
        };
        let row = if z < third_z {
            0
        } else if z < 2 * third_z {
            1
        } else {
            2
        };
        match (column, row) {
            (0, 0) => "bottom-left corner",
            (0, 1) => "middle of the left side",
            (0, _) => "top-left corner",
            (1, 0) => "middle of the bottom side",
            (1, 1) => "middle of the arena",
            (1, _) => "middle of the top side",
            (_, 0) => "bottom-right corner",
            (_, 1) => "middle of the right side",
            _ => "top-right corner",
        }
    }

    /// Every world region the arena touches.
    pub fn region_box(&self, region_size: i64) -> RegionBox {
        RegionBox::covering(
            self.west_x(),
            self.east_x(),
            self.north_z(),
            self.south_z(),
            region_size,
        )
    }

    /// A random horizontal position for a new avatar (`y` left at the origin's height).
    pub fn random_spawn_point(&self, rng: &mut impl Rng) -> Point {
        let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let dx = rng.random::<f64>() * self.half_width as f64 * sign;
        let dz = rng.random::<f64>() * self.depth as f64;
        self.origin.offset(dx, 0.0, dz)
    }

    /// A uniformly random block column inside the arena, edges included.
    pub fn random_block_column(&self, rng: &mut impl Rng) -> (i64, i64) {
        let x = rng.random_range(self.west_x()..=self.east_x());
        let z = rng.random_range(self.north_z()..=self.south_z());
        (x, z)
    }

    /// Sample points checked against the terrain filter: the four corners
    /// and one interior point halfway down the centre line.
    pub fn witness_points(&self) -> [Point; 5] {
        let o = self.origin;
        let hw = self.half_width as f64;
        let d = self.depth as f64;
        [
            o.offset(-hw, 0.0, 0.0),
            o.offset(hw, 0.0, 0.0),
            o.offset(-hw, 0.0, d),
            o.offset(hw, 0.0, d),
            o.offset(0.0, 0.0, d / 2.0),
        ]
    }
}

/// Horizontal offset for a teleport of `distance` blocks facing `degrees`.
/// 0 points along +Z; positive angles turn towards -X.
pub fn heading_offset(degrees: i32, distance: f64) -> (f64, f64) {
    let radians = f64::from(degrees).to_radians();
    ((-radians).sin() * distance, radians.cos() * distance)
}

/// Search the world for a location whose terrain suits an arena.
pub fn place_arena<W: WorldPort>(
    config: &ArenaConfig,
    world: &mut W,
    rng: &mut impl Rng,
) -> Result<Arena, ArenaError> {
    let attempts = config.placement_max_attempts;
    for attempt in 1..=attempts {
        let candidate = Point::new(
            rng.random::<f64>() * config.placement_extent,
            config.placement_height,
            rng.random::<f64>() * config.placement_extent,
        );
        let Some(anchor) = world.place_arena_anchor(candidate) else {
            continue;
        };
        let arena = Arena::new(anchor, config.half_width, config.depth);
        let acceptable = arena.witness_points().into_iter().all(|p| {
            !config
                .disallowed_terrain
                .contains(&world.sample_terrain_category(p))
        });
        if acceptable {
            tracing::info!(
                attempt,
                x = anchor.x,
                z = anchor.z,
                "Found arena location"
            );
            return Ok(arena);
        }
    }
    tracing::error!(attempts, "Arena placement exhausted");
    Err(ArenaError::PlacementExhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use royale_core::test_helpers::FakeWorld;
    use royale_core::world::TerrainCategory;

    fn arena() -> Arena {
        Arena::new(Point::new(100.0, 64.0, 200.0), 40, 40)
    }

    #[test]
    fn inside_is_inclusive() {
        let a = arena();
        assert!(a.is_inside(&Point::new(60.0, 0.0, 200.0)));
        assert!(a.is_inside(&Point::new(140.9, 0.0, 240.9)));
        assert!(!a.is_inside(&Point::new(59.9, 0.0, 210.0)));
        assert!(!a.is_inside(&Point::new(100.0, 0.0, 199.5)));
        assert!(!a.is_inside(&Point::new(100.0, 0.0, 241.0)));
    }

    #[test]
    fn relative_position_counts_from_the_east() {
        let a = arena();
        assert_eq!(a.relative_position(&Point::new(140.0, 0.0, 200.0)), (0, 0));
        assert_eq!(a.relative_position(&Point::new(60.0, 0.0, 240.0)), (80, 40));
        assert_eq!(a.relative_position(&Point::new(100.0, 0.0, 220.0)), (40, 20));
    }

    #[test]
    fn sector_names() {
        let a = arena();
        assert_eq!(a.sector_name(&Point::new(140.0, 0.0, 200.0)), "bottom-left corner");
        assert_eq!(a.sector_name(&Point::new(100.0, 0.0, 220.0)), "middle of the arena");
        assert_eq!(a.sector_name(&Point::new(60.0, 0.0, 240.0)), "top-right corner");
        assert_eq!(a.sector_name(&Point::new(140.0, 0.0, 240.0)), "top-left corner");
        assert_eq!(a.sector_name(&Point::new(60.0, 0.0, 220.0)), "middle of the right side");
    }

    #[test]
    fn region_box_matches_floor_division() {
        let a = Arena::new(Point::new(0.0, 64.0, 0.0), 40, 40);
        let rb = a.region_box(16);
        assert_eq!((rb.min_x, rb.max_x, rb.min_z, rb.max_z), (-3, 2, 0, 2));
    }

    #[test]
    fn heading_offset_zero_points_along_z() {
        let (dx, dz) = heading_offset(0, 5.0);
        assert!(dx.abs() < 1e-9);
        assert!((dz - 5.0).abs() < 1e-9);
        let (dx, dz) = heading_offset(90, 3.0);
        assert!((dx + 3.0).abs() < 1e-9);
        assert!(dz.abs() < 1e-9);
    }

    #[test]
    fn placement_exhausts_after_configured_attempts() {
        let mut world = FakeWorld::new().with_terrain(|_| TerrainCategory::Ocean);
        let mut rng = StdRng::seed_from_u64(1);
        let err = place_arena(&ArenaConfig::default(), &mut world, &mut rng).unwrap_err();
        assert_eq!(err, ArenaError::PlacementExhausted { attempts: 1000 });
        assert_eq!(world.anchor_calls, 1000);
    }

    #[test]
    fn rejected_anchors_count_as_attempts() {
        let mut world = FakeWorld::new();
        world.reject_anchors = true;
        let mut rng = StdRng::seed_from_u64(2);
        let err = place_arena(&ArenaConfig::default(), &mut world, &mut rng).unwrap_err();
        assert!(matches!(err, ArenaError::PlacementExhausted { attempts: 1000 }));
        assert_eq!(world.terrain_samples.get(), 0);
    }

    #[test]
    fn placement_checks_five_witness_points() {
        let mut world = FakeWorld::new();
        let mut rng = StdRng::seed_from_u64(3);
        let a = place_arena(&ArenaConfig::default(), &mut world, &mut rng).unwrap();
        assert_eq!(world.anchor_calls, 1);
        assert_eq!(world.terrain_samples.get(), 5);
        assert!(a.origin().x >= 0.0 && a.origin().x < 10_000_000.0);
        assert!((a.origin().y - 255.0).abs() < f64::EPSILON);
    }

    #[test]
    fn frozen_ocean_is_acceptable() {
        let mut world = FakeWorld::new().with_terrain(|_| TerrainCategory::FrozenOcean);
        let mut rng = StdRng::seed_from_u64(4);
        assert!(place_arena(&ArenaConfig::default(), &mut world, &mut rng).is_ok());
    }

    #[test]
    fn one_bad_witness_rejects_the_candidate() {
        use std::cell::Cell;

        // The fourth witness of every candidate is jungle. Sampling stops at
        // the first bad witness, so the next sample opens a new candidate.
        let position = Cell::new(0usize);
        let mut world = FakeWorld::new().with_terrain(move |_| {
            let index = position.get();
            if index == 3 {
                position.set(0);
                TerrainCategory::Jungle
            } else {
                position.set(index + 1);
                TerrainCategory::Plains
            }
        });
        let cfg = ArenaConfig {
            placement_max_attempts: 10,
            ..ArenaConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let err = place_arena(&cfg, &mut world, &mut rng).unwrap_err();
        assert_eq!(err, ArenaError::PlacementExhausted { attempts: 10 });
        assert_eq!(world.anchor_calls, 10);
        assert_eq!(world.terrain_samples.get(), 10 * 4);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn spawn_points_are_inside(
                seed in any::<u64>(),
                ox in -1_000_000.0f64..1_000_000.0,
                oz in -1_000_000.0f64..1_000_000.0,
                half_width in 1i64..100,
                depth in 1i64..100,
            ) {
                let a = Arena::new(Point::new(ox, 64.0, oz), half_width, depth);
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..16 {
                    let p = a.random_spawn_point(&mut rng);
                    prop_assert!(a.is_inside(&p), "{p:?} outside {a:?}");
                    let (rx, rz) = a.relative_position(&p);
                    prop_assert!((0..=2 * half_width).contains(&rx));
                    prop_assert!((0..=depth).contains(&rz));
                }
            }

            #[test]
            fn hazard_columns_are_inside(seed in any::<u64>(), ox in -1000.0f64..1000.0) {
                let a = Arena::new(Point::new(ox, 64.0, 0.0), 40, 40);
                let mut rng = StdRng::seed_from_u64(seed);
                let (x, z) = a.random_block_column(&mut rng);
                prop_assert!(a.is_inside(&Point::new(x as f64, 0.0, z as f64)));
            }
        }
    }
}
