/// Errors raised while building an arena.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// No acceptable location was found. Fatal for this match.
    #[error("no valid arena location after {attempts} attempts")]
    PlacementExhausted { attempts: u32 },
    #[error("invalid arena config: {0}")]
    InvalidConfig(String),
}
