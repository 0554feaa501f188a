use thiserror::Error;

/// Chyby viditelné pro volajícího. Vše ostatní jen zhorší agregát, request nespadne.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("roster stability needs at least 2 roster snapshots, got {available}")]
    InsufficientSnapshots { available: usize },

    #[error("unknown stat field `{0}`")]
    UnknownStatField(String),

    #[error("team {0} not found")]
    TeamNotFound(String),

    #[error("no matches found for team {0}")]
    NoMatches(String),
}

pub type StatsResult<T> = std::result::Result<T, StatsError>;
