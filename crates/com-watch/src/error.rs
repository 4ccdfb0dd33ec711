//! Error types for the port watcher

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the watcher's lifecycle operations
#[derive(Debug, Error)]
pub enum WatchError {
    /// The polling thread did not exit within the allotted time
    #[error("port watcher did not stop within {timeout:?}")]
    ShutdownTimeout {
        /// How long the caller waited
        timeout: Duration,
    },

    /// A previous stop request has not completed yet
    #[error("port watcher is still stopping")]
    StopPending,

    /// The polling thread could not be spawned
    #[error("failed to spawn port watcher thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The polling loop died unexpectedly
    #[error("port watcher loop failed: {0}")]
    LoopFailed(String),
}

/// Failure reported by a subscriber
///
/// Subscriber failures are logged and isolated; they never reach the
/// caller of any watcher operation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}
