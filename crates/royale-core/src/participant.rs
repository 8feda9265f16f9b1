use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::parser::CombatParameters;

/// Stable participant key: the chat sender handle.
pub type ParticipantId = String;

/// Opaque reference to an avatar owned by the world runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AvatarRef(pub u64);

impl std::fmt::Display for AvatarRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "avatar#{}", self.0)
    }
}

pub const MIN_ELEVATION: i32 = -90;
pub const MAX_ELEVATION: i32 = 90;
pub const MIN_POWER: i32 = 0;
pub const MAX_POWER: i32 = 100;
pub const MIN_LIFETIME: f64 = 0.0;
pub const MAX_LIFETIME: f64 = 5.0;

/// Stored aim parameters. Values are clamped on every write.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AimState {
    pub direction: i32,
    pub elevation: i32,
    pub power: i32,
    pub lifetime: f64,
    /// Set once a complete parameter set was supplied; cleared by cancel.
    pub armed: bool,
}

impl AimState {
    pub fn set_full(&mut self, params: CombatParameters) {
        self.direction = params.direction;
        self.set_elevation(params.elevation);
        self.set_power(params.power);
        self.set_lifetime(params.lifetime);
        self.armed = true;
    }

    pub fn add_direction(&mut self, delta: i32) {
        self.direction = self.direction.saturating_add(delta);
    }

    pub fn add_elevation(&mut self, delta: i32) {
        self.set_elevation(self.elevation.saturating_add(delta));
    }

    pub fn add_power(&mut self, delta: i32) {
        self.set_power(self.power.saturating_add(delta));
    }

    pub fn add_lifetime(&mut self, delta: f64) {
        if delta.is_finite() {
            self.set_lifetime(self.lifetime + delta);
        }
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// The shot described by the current parameters.
    pub fn shot(&self) -> Shot {
        Shot {
            direction: self.direction,
            elevation: self.elevation,
            power: self.power,
            lifetime: self.lifetime,
        }
    }

    fn set_elevation(&mut self, elevation: i32) {
        self.elevation = elevation.clamp(MIN_ELEVATION, MAX_ELEVATION);
    }

    fn set_power(&mut self, power: i32) {
        self.power = power.clamp(MIN_POWER, MAX_POWER);
    }

    fn set_lifetime(&mut self, lifetime: f64) {
        self.lifetime = lifetime.clamp(MIN_LIFETIME, MAX_LIFETIME);
    }
}

/// One projectile launch request handed to the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    /// Heading in degrees: 0 is the arena top (+Z), 90 its right side (-X).
    pub direction: i32,
    /// Engine convention: negative is up.
    pub elevation: i32,
    pub power: i32,
    /// Fuse in seconds.
    pub lifetime: f64,
}

/// Avatar colour selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarColor {
    #[default]
    White,
    Orange,
    Magenta,
    LightBlue,
    Yellow,
    Lime,
    Pink,
    Gray,
    LightGray,
    Cyan,
    Purple,
    Blue,
    Brown,
    Green,
    Red,
    Black,
}

impl AvatarColor {
    pub const ALL: [AvatarColor; 16] = [
        AvatarColor::White,
        AvatarColor::Orange,
        AvatarColor::Magenta,
        AvatarColor::LightBlue,
        AvatarColor::Yellow,
        AvatarColor::Lime,
        AvatarColor::Pink,
        AvatarColor::Gray,
        AvatarColor::LightGray,
        AvatarColor::Cyan,
        AvatarColor::Purple,
        AvatarColor::Blue,
        AvatarColor::Brown,
        AvatarColor::Green,
        AvatarColor::Red,
        AvatarColor::Black,
    ];

    /// Parse a colour name as typed in chat (`light_blue`, `lightblue`, `LIGHT_BLUE`).
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        let color = match normalized.as_str() {
            "white" => Self::White,
            "orange" => Self::Orange,
            "magenta" => Self::Magenta,
            "lightblue" => Self::LightBlue,
            "yellow" => Self::Yellow,
            "lime" => Self::Lime,
            "pink" => Self::Pink,
            "gray" | "grey" => Self::Gray,
            "lightgray" | "lightgrey" => Self::LightGray,
            "cyan" => Self::Cyan,
            "purple" => Self::Purple,
            "blue" => Self::Blue,
            "brown" => Self::Brown,
            "green" => Self::Green,
            "red" => Self::Red,
            "black" => Self::Black,
            _ => return None,
        };
        Some(color)
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::White => (0xF9, 0xFF, 0xFE),
            Self::Orange => (0xF9, 0x80, 0x1D),
            Self::Magenta => (0xC7, 0x4E, 0xBD),
            Self::LightBlue => (0x3A, 0xB3, 0xDA),
            Self::Yellow => (0xFE, 0xD8, 0x3D),
            Self::Lime => (0x80, 0xC7, 0x1F),
            Self::Pink => (0xF3, 0x8B, 0xAA),
            Self::Gray => (0x47, 0x4F, 0x52),
            Self::LightGray => (0x9D, 0x9D, 0x97),
            Self::Cyan => (0x16, 0x9C, 0x9C),
            Self::Purple => (0x89, 0x32, 0xB8),
            Self::Blue => (0x3C, 0x44, 0xAA),
            Self::Brown => (0x83, 0x54, 0x32),
            Self::Green => (0x5E, 0x7C, 0x16),
            Self::Red => (0xB0, 0x2E, 0x26),
            Self::Black => (0x1D, 0x1D, 0x21),
        }
    }

    /// Map a chat colour (`#RRGGBB`) to a dye colour. The stock chat palette
    /// has fixed picks; anything else takes the nearest colour by RGB distance.
    pub fn from_chat_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let fixed = match digits.to_ascii_uppercase().as_str() {
            "FF0000" | "B22222" => Some(Self::Red),
            "008000" => Some(Self::Green),
            "2E8B57" => Some(Self::Cyan),
            "91CD32" | "00FF7F" => Some(Self::Lime),
            "0000FF" | "1E90FF" => Some(Self::Blue),
            "5F9EA0" => Some(Self::LightBlue),
            "FF7F50" | "FF4500" | "D2691E" => Some(Self::Orange),
            "DAA520" => Some(Self::Yellow),
            "FF69B4" => Some(Self::Pink),
            "8A2BE2" => Some(Self::Purple),
            _ => None,
        };
        if fixed.is_some() {
            return fixed;
        }

        let value = u32::from_str_radix(digits, 16).ok()?;
        let (r, g, b) = ((value >> 16) as u8, (value >> 8) as u8, value as u8);
        Self::ALL.iter().copied().min_by_key(|c| {
            let (cr, cg, cb) = c.rgb();
            let dr = i32::from(cr) - i32::from(r);
            let dg = i32::from(cg) - i32::from(g);
            let db = i32::from(cb) - i32::from(b);
            dr * dr + dg * dg + db * db
        })
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// A remote participant (a chat user), not an in-world entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: Option<String>,
    pub color: AvatarColor,
    pub avatar: Option<AvatarRef>,
    pub aim: AimState,
    /// Match clock time at which the special teleport becomes available.
    pub ability_ready_at: Duration,
    pub kills: u32,
    /// Registration sequence; lower joined earlier.
    pub join_order: u64,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, display_name: Option<String>, join_order: u64) -> Self {
        Self {
            id: id.into(),
            display_name,
            color: AvatarColor::default(),
            avatar: None,
            aim: AimState::default(),
            ability_ready_at: Duration::ZERO,
            kills: 0,
            join_order,
        }
    }

    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn can_place_avatar(&self) -> bool {
        self.avatar.is_none()
    }

    pub fn can_use_ability(&self, now: Duration) -> bool {
        now >= self.ability_ready_at
    }

    /// Remaining cooldown on the special ability, zero when ready.
    pub fn ability_cooldown(&self, now: Duration) -> Duration {
        self.ability_ready_at.saturating_sub(now)
    }
}
