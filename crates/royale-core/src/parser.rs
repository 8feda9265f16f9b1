//! Combat parameter grammar for the set-full-aim command.
//!
//! Two grammars are accepted. The numeric one takes exactly four tokens
//! (`direction elevation power lifetime`). The word one scans every token for
//! known direction, elevation, distance and lifetime words. Neither grammar
//! clamps; range limits are applied when the values are stored on a
//! participant.

use serde::{Deserialize, Serialize};

/// Parsed aim parameters, in engine convention (negative elevation is up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatParameters {
    pub direction: i32,
    pub elevation: i32,
    pub power: i32,
    pub lifetime: f64,
}

const DIRECTION_WORDS: &[(&str, i32)] = &[
    ("top", 0),
    ("right", 90),
    ("bottom", 180),
    ("left", 270),
    ("t", 0),
    ("r", 90),
    ("b", 180),
    ("l", 270),
    ("north", 0),
    ("east", 90),
    ("south", 180),
    ("west", 270),
    ("n", 0),
    ("e", 90),
    ("s", 180),
    ("w", 270),
    ("northeast", 45),
    ("southeast", 135),
    ("southwest", 225),
    ("northwest", 315),
    ("ne", 45),
    ("se", 135),
    ("sw", 225),
    ("nw", 315),
];

const DEFAULT_ELEVATION: i32 = 45;
const ELEVATION_WORDS: &[(&str, i32)] = &[("up", 70), ("down", 20), ("u", 70), ("d", 20)];

const DEFAULT_POWER: i32 = 40;
const POWER_WORDS: &[(&str, i32)] = &[
    ("close", 20),
    ("far", 60),
    ("veryfar", 80),
    ("c", 20),
    ("f", 60),
    ("v", 80),
];

const DEFAULT_LIFETIME: f64 = 2.5;
const LIFETIME_WORDS: &[(&str, f64)] = &[("quick", 1.0), ("slow", 5.0), ("q", 1.0), ("o", 5.0)];

/// Parse command tokens into combat parameters, trying the numeric grammar
/// first and the word grammar second. Returns `None` when neither matches.
pub fn parse_combat_parameters<S: AsRef<str>>(tokens: &[S]) -> Option<CombatParameters> {
    parse_numeric(tokens).or_else(|| parse_words(tokens))
}

fn parse_numeric<S: AsRef<str>>(tokens: &[S]) -> Option<CombatParameters> {
    let [direction, elevation, power, lifetime] = tokens else {
        return None;
    };

    let direction = direction.as_ref().parse::<i32>().ok()?;
    // Operators type positive numbers for "up"; the engine uses negative.
    let elevation = elevation.as_ref().parse::<i32>().ok()?.checked_neg()?;
    let power = power.as_ref().parse::<i32>().ok()?;
    let lifetime = lifetime.as_ref().parse::<f64>().ok().filter(|v| v.is_finite())?;

    Some(CombatParameters {
        direction,
        elevation,
        power,
        lifetime,
    })
}

fn parse_words<S: AsRef<str>>(tokens: &[S]) -> Option<CombatParameters> {
    let mut direction = None;
    let mut elevation = None;
    let mut power = None;
    let mut lifetime = None;

    for token in tokens {
        let token = token.as_ref();
        direction = direction.or_else(|| lookup(DIRECTION_WORDS, token));
        elevation = elevation.or_else(|| lookup(ELEVATION_WORDS, token));
        power = power.or_else(|| lookup(POWER_WORDS, token));
        lifetime = lifetime.or_else(|| lookup(LIFETIME_WORDS, token));
    }

    Some(CombatParameters {
        direction: direction?,
        elevation: -elevation.unwrap_or(DEFAULT_ELEVATION),
        power: power.unwrap_or(DEFAULT_POWER),
        lifetime: lifetime.unwrap_or(DEFAULT_LIFETIME),
    })
}

fn lookup<T: Copy>(table: &[(&str, T)], word: &str) -> Option<T> {
    table.iter().find(|(w, _)| *w == word).map(|(_, v)| *v)
}
