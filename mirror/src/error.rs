//! Error types for the mirror.

use thiserror::Error;

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Errors that can occur while mirroring.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] treemirror_directory_watcher::WatcherError),

    /// Remote backend error.
    #[error("remote error: {0}")]
    Remote(#[from] treemirror_remote::RemoteError),

    /// The event stream ended while the service was still running.
    #[error("event stream closed unexpectedly")]
    StreamClosed,

    /// Config file parse error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
