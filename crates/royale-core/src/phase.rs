use serde::{Deserialize, Serialize};

/// Match-wide stage.
///
/// - `CreatingArena`: an arena is being placed and its surroundings loaded; nobody can join.
/// - `Lobby`: participants may join and reposition their avatars.
/// - `PreGameplay`: joining is closed and the arena settles before the first volley.
/// - `Gameplay`: rounds fire until one avatar remains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    CreatingArena,
    Lobby,
    PreGameplay,
    Gameplay,
}

impl Phase {
    /// Whether `next` is a legal forward step from this phase within one match.
    pub fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::CreatingArena, Phase::Lobby)
                | (Phase::Lobby, Phase::PreGameplay)
                | (Phase::PreGameplay, Phase::Gameplay)
        )
    }

    pub fn allows_joining(self) -> bool {
        self == Phase::Lobby
    }

    pub fn allows_rounds(self) -> bool {
        self == Phase::Gameplay
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::CreatingArena => "creating_arena",
            Phase::Lobby => "lobby",
            Phase::PreGameplay => "pre_gameplay",
            Phase::Gameplay => "gameplay",
        };
        f.write_str(name)
    }
}
