//! Errors surfaced by the authority server.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::oneshot;

use tactics_core::error::GameError;

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Failures of the server process itself, or core errors passed through.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A file could not be read or written.
    #[error("I/O error on '{path}'")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration or script file was not valid RON.
    #[error("failed to parse '{path}': {message}")]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the match session.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The authority task is gone.
    #[error("authority command channel closed")]
    CommandChannelClosed,

    /// The authority task dropped a reply.
    #[error("authority reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    /// The authority task panicked or was cancelled.
    #[error("authority task join failed")]
    Join(#[source] tokio::task::JoinError),

    /// The authority answered a request with the wrong kind of outcome.
    #[error("unexpected reply from authority: {0}")]
    UnexpectedReply(String),

    /// Waiting for the shutdown signal failed.
    #[error("failed to listen for shutdown signal")]
    Signal(#[source] std::io::Error),
}
