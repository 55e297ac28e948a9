use crate::draft::TeamSide;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found in catalog: {0}")]
    NotFoundInCatalog(String),

    #[error("Team {side} already has 5 players")]
    TeamFull { side: TeamSide },

    #[error("{identifier} is already on team {side}")]
    DuplicatePlayer { side: TeamSide, identifier: String },

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("No saved team named '{0}'")]
    TeamNotFound(String),

    #[error("Failed to fetch profile for {identifier}: {reason}")]
    ProfileFetch { identifier: String, reason: String },

    #[error("Invalid draft action: {0}")]
    InvalidDraftMutation(String),

    #[error("Invalid battletag '{0}'. Use format: Name#1234")]
    InvalidBattletag(String),

    #[error("Rate limit exceeded, please try again later")]
    RateLimited,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
