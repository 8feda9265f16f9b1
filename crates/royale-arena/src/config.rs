use std::time::Duration;

use serde::{Deserialize, Serialize};

use royale_core::world::TerrainCategory;

/// Data-driven arena tuning (geometry, cadence, hazards).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Half of the east-west span (blocks). The arena is `2 * half_width` wide.
    pub half_width: i64,
    /// North-south span (blocks), measured south from the origin.
    pub depth: i64,
    /// Placement samples coordinates in `[0, placement_extent)` on X and Z.
    pub placement_extent: f64,
    /// Height used for placement candidates.
    pub placement_height: f64,
    pub placement_max_attempts: u32,
    pub disallowed_terrain: Vec<TerrainCategory>,
    /// Interval between readiness probes (seconds).
    pub readiness_poll_secs: f64,
    /// Minimum world tick rate before the lobby may open.
    pub min_tick_rate: f64,
    /// Width of one loadable world region (blocks).
    pub region_size: i64,
    /// Lobby duration before rounds start on their own (seconds).
    pub auto_start_delay_secs: f64,
    pub initial_round_interval_secs: f64,
    /// Multiplier applied to the round interval after each round.
    pub round_interval_decay: f64,
    /// Floor for the round interval (seconds).
    pub min_round_interval_secs: f64,
    /// Time from the first round until sudden death (seconds).
    pub hazard_delay_secs: f64,
    /// Period between hazard spawns during sudden death (seconds).
    pub hazard_period_secs: f64,
    /// Hazards appear this many blocks above the surface.
    pub hazard_height_offset: f64,
    /// New avatars drop in from this many blocks above the surface.
    pub spawn_drop_height: f64,
    pub teleport_cooldown_secs: f64,
    pub teleport_min_distance: i64,
    pub teleport_max_distance: i64,
    /// Teleported avatars land this many blocks above the surface.
    pub teleport_height_offset: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_width: 40,
            depth: 40,
            placement_extent: 10_000_000.0,
            placement_height: 255.0,
            placement_max_attempts: 1000,
            disallowed_terrain: TerrainCategory::DEFAULT_DISALLOWED.to_vec(),
            readiness_poll_secs: 2.0,
            min_tick_rate: 19.5,
            region_size: 16,
            auto_start_delay_secs: 60.0,
            initial_round_interval_secs: 20.0,
            round_interval_decay: 0.9,
            min_round_interval_secs: 1.0,
            hazard_delay_secs: 300.0,
            hazard_period_secs: 0.5,
            hazard_height_offset: 5.0,
            spawn_drop_height: 30.0,
            teleport_cooldown_secs: 15.0,
            teleport_min_distance: 3,
            teleport_max_distance: 10,
            teleport_height_offset: 2.0,
        }
    }
}

impl ArenaConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("ROYALE_ARENA_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
        {
            match toml::from_str::<Self>(&contents) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path, "Failed to parse arena config: {e}"),
            }
        }
        if let Ok(contents) = std::fs::read_to_string("config/arena.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }

    /// Problems that would make the arena unusable. Empty when valid.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.half_width <= 0 || self.depth <= 0 {
            problems.push("half_width and depth must be > 0".to_string());
        }
        if self.placement_max_attempts == 0 {
            problems.push("placement_max_attempts must be > 0".to_string());
        }
        if !(self.placement_extent > 0.0) {
            problems.push("placement_extent must be > 0".to_string());
        }
        if self.region_size <= 0 {
            problems.push("region_size must be > 0".to_string());
        }
        for (name, secs) in [
            ("readiness_poll_secs", self.readiness_poll_secs),
            ("min_round_interval_secs", self.min_round_interval_secs),
            ("hazard_period_secs", self.hazard_period_secs),
        ] {
            if !(secs > 0.0 && secs.is_finite()) {
                problems.push(format!("{name} must be a positive number of seconds"));
            }
        }
        for (name, secs) in [
            ("auto_start_delay_secs", self.auto_start_delay_secs),
            ("initial_round_interval_secs", self.initial_round_interval_secs),
            ("hazard_delay_secs", self.hazard_delay_secs),
            ("teleport_cooldown_secs", self.teleport_cooldown_secs),
        ] {
            if !(secs >= 0.0 && secs.is_finite()) {
                problems.push(format!("{name} must be a non-negative number of seconds"));
            }
        }
        if !(self.round_interval_decay > 0.0 && self.round_interval_decay <= 1.0) {
            problems.push("round_interval_decay must be in (0, 1]".to_string());
        }
        if self.teleport_min_distance < 0 || self.teleport_min_distance > self.teleport_max_distance {
            problems.push("teleport distances must satisfy 0 <= min <= max".to_string());
        }
        problems
    }

    pub fn readiness_poll(&self) -> Duration {
        secs(self.readiness_poll_secs)
    }

    pub fn auto_start_delay(&self) -> Duration {
        secs(self.auto_start_delay_secs)
    }

    pub fn initial_round_interval(&self) -> Duration {
        secs(self.initial_round_interval_secs)
    }

    pub fn min_round_interval(&self) -> Duration {
        secs(self.min_round_interval_secs)
    }

    pub fn hazard_delay(&self) -> Duration {
        secs(self.hazard_delay_secs)
    }

    pub fn hazard_period(&self) -> Duration {
        secs(self.hazard_period_secs)
    }

    pub fn teleport_cooldown(&self) -> Duration {
        secs(self.teleport_cooldown_secs)
    }
}

/// Seconds to a `Duration`, treating negative or non-finite input as zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
