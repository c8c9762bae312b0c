//! Monitor error types.

use modwatch_config::ConfigError;

/// Errors that prevent a session from running.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    ConfigNotReady(#[from] ConfigError),

    #[error("session already started")]
    AlreadyStarted,
}

/// The audible cue could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification sink unavailable: {0}")]
    SinkUnavailable(String),
}

/// Errors launching the game.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("game launcher unavailable")]
    Unavailable,

    #[error("failed to launch game: {0}")]
    Spawn(#[from] std::io::Error),
}
