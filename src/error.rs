//! Error types surfaced by configuration loading and the streaming manager.

use std::io;

use thiserror::Error;

/// A world configuration that cannot be used to start streaming.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Chunks would be destroyed while they are still inside the view radius.
    #[error("unload_distance ({unload}) must be at least view_distance ({view})")]
    UnloadBelowView { view: i32, unload: i32 },

    /// A distance in chunk units was negative.
    #[error("{name} must not be negative (got {value})")]
    NegativeDistance { name: &'static str, value: i32 },

    #[error("failed to read world config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse world config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by [`WorldStreamer`](crate::WorldStreamer) lifecycle calls.
#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("invalid world configuration: {0}")]
    Config(#[from] ConfigError),

    /// `start` was called while the background loop is already running.
    #[error("the streaming thread is already running")]
    AlreadyRunning,

    #[error("failed to spawn the streaming thread: {0}")]
    Spawn(#[source] io::Error),
}
