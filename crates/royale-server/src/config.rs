use std::time::Duration;

use serde::Deserialize;

use royale_arena::config::ArenaConfig;

use crate::error::ServerError;

/// Top-level server configuration, loaded from `royale.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub log_format: LogFormat,
    pub auth: AuthFileConfig,
    pub limits: LimitsConfig,
    #[serde(rename = "match")]
    pub match_loop: MatchLoopConfig,
    pub world: SimWorldConfig,
    #[serde(default = "ArenaConfig::load")]
    pub arena: ArenaConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_format: LogFormat::default(),
            auth: AuthFileConfig::default(),
            limits: LimitsConfig::default(),
            match_loop: MatchLoopConfig::default(),
            world: SimWorldConfig::default(),
            arena: ArenaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Auth section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthFileConfig {
    /// Bearer token that marks a chat message as coming from an admin.
    /// None = only the `admins` list grants admin commands.
    pub admin_token: Option<String>,
    /// Chat handles that may always use admin commands (compared lowercase).
    pub admins: Vec<String>,
}

/// Infrastructure limits (subscriber caps, buffer sizes, message sizes).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_sse_subscribers: usize,
    pub broadcast_capacity: usize,
    pub command_buffer: usize,
    pub max_message_len: usize,
    pub max_sender_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sse_subscribers: 100,
            broadcast_capacity: 1024,
            command_buffer: 256,
            max_message_len: 500,
            max_sender_len: 64,
        }
    }
}

/// Match loop pacing and sequencing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchLoopConfig {
    pub tick_rate_hz: f64,
    /// Pause between a decided match and the next arena.
    pub reset_delay_secs: f64,
    /// Fixed RNG seed for reproducible matches. None = seeded from the OS.
    pub seed: Option<u64>,
}

impl Default for MatchLoopConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20.0,
            reset_delay_secs: 15.0,
            seed: None,
        }
    }
}

impl MatchLoopConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.reset_delay_secs).unwrap_or(Duration::ZERO)
    }
}

/// Tuning for the built-in simulated world.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimWorldConfig {
    /// Seconds for a requested region to finish loading.
    pub region_load_secs: f64,
    pub avatar_health: f64,
    pub blast_radius: f64,
    pub hazard_radius: f64,
    /// Falls up to this many blocks are harmless.
    pub safe_fall_height: f64,
}

impl Default for SimWorldConfig {
    fn default() -> Self {
        Self {
            region_load_secs: 1.0,
            avatar_health: 8.0,
            blast_radius: 4.0,
            hazard_radius: 1.5,
            safe_fall_height: 3.0,
        }
    }
}

impl ServerConfig {
    /// Check the configuration, logging every problem found. Errors on the
    /// first problem that would keep the server from running.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ServerError::InvalidConfig(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            )));
        }
        if self.auth.admin_token.is_some() {
            tracing::warn!("admin_token is set in config file, use ROYALE_ADMIN_TOKEN env var in production");
        }
        if !(self.match_loop.tick_rate_hz > 0.0 && self.match_loop.tick_rate_hz <= 1000.0) {
            return Err(ServerError::InvalidConfig(
                "match.tick_rate_hz must be in (0, 1000]".to_string(),
            ));
        }
        if !(self.match_loop.reset_delay_secs >= 0.0) {
            return Err(ServerError::InvalidConfig(
                "match.reset_delay_secs must be >= 0".to_string(),
            ));
        }
        for (name, value) in [
            ("limits.max_sse_subscribers", self.limits.max_sse_subscribers),
            ("limits.broadcast_capacity", self.limits.broadcast_capacity),
            ("limits.command_buffer", self.limits.command_buffer),
            ("limits.max_message_len", self.limits.max_message_len),
            ("limits.max_sender_len", self.limits.max_sender_len),
        ] {
            if value == 0 {
                return Err(ServerError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        if !(self.world.avatar_health > 0.0) {
            return Err(ServerError::InvalidConfig(
                "world.avatar_health must be > 0".to_string(),
            ));
        }
        let problems = self.arena.problems();
        if !problems.is_empty() {
            for problem in &problems {
                tracing::error!(%problem, "Invalid arena config");
            }
            return Err(ServerError::InvalidConfig(problems.join("; ")));
        }
        Ok(())
    }

    /// Load config from `royale.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("royale.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from royale.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse royale.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No royale.toml found, using defaults");
                ServerConfig {
                    arena: ArenaConfig::load(),
                    ..ServerConfig::default()
                }
            },
        };
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("ROYALE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Ok(token) = std::env::var("ROYALE_ADMIN_TOKEN")
            && !token.is_empty()
        {
            self.auth.admin_token = Some(token);
        }
        if let Ok(admins) = std::env::var("ROYALE_ADMINS")
            && !admins.is_empty()
        {
            self.auth.admins = admins
                .split(',')
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect();
        }
        if let Ok(format) = std::env::var("ROYALE_LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "json" => self.log_format = LogFormat::Json,
                "pretty" => self.log_format = LogFormat::Pretty,
                _ => {},
            }
        }
        if let Ok(val) = std::env::var("ROYALE_SEED")
            && let Ok(seed) = val.parse::<u64>()
        {
            self.match_loop.seed = Some(seed);
        }
        if let Ok(val) = std::env::var("ROYALE_TICK_RATE")
            && let Ok(hz) = val.parse::<f64>()
        {
            self.match_loop.tick_rate_hz = hz;
        }
        if let Ok(val) = std::env::var("ROYALE_MAX_SSE_SUBSCRIBERS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_sse_subscribers = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert!(cfg.auth.admin_token.is_none());
        assert_eq!(cfg.match_loop.tick_interval(), Duration::from_millis(50));
        assert_eq!(cfg.match_loop.reset_delay(), Duration::from_secs(15));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_sections() {
        let toml_str = r#"
listen_addr = "127.0.0.1:9090"
log_format = "json"

[auth]
admin_token = "secret123"
admins = ["streamer"]

[match]
tick_rate_hz = 10.0
seed = 42

[arena]
auto_start_delay_secs = 30.0
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9090");
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.auth.admin_token.as_deref(), Some("secret123"));
        assert_eq!(cfg.auth.admins, vec!["streamer"]);
        assert_eq!(cfg.match_loop.seed, Some(42));
        assert!((cfg.match_loop.tick_rate_hz - 10.0).abs() < f64::EPSILON);
        assert!((cfg.match_loop.reset_delay_secs - 15.0).abs() < f64::EPSILON);
        assert!((cfg.arena.auto_start_delay_secs - 30.0).abs() < f64::EPSILON);
        assert_eq!(cfg.arena.half_width, 40);
    }

    #[test]
    fn validate_rejects_invalid_addr() {
        let cfg = ServerConfig {
            listen_addr: "not-an-address".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ServerError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_zero_limits_and_bad_tick_rate() {
        let cfg = ServerConfig {
            limits: LimitsConfig {
                broadcast_capacity: 0,
                ..LimitsConfig::default()
            },
            ..ServerConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ServerConfig {
            match_loop: MatchLoopConfig {
                tick_rate_hz: 0.0,
                ..MatchLoopConfig::default()
            },
            ..ServerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_surfaces_arena_problems() {
        let cfg = ServerConfig {
            arena: ArenaConfig {
                half_width: 0,
                ..ArenaConfig::default()
            },
            ..ServerConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("half_width"));
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: ServerConfig = toml::from_str("listen_addr = \"0.0.0.0:8080\"").unwrap();
        assert_eq!(cfg.limits.max_sse_subscribers, 100);
        assert!((cfg.world.avatar_health - 8.0).abs() < f64::EPSILON);
    }
}
