//! Error types for the directory watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// The watch root is missing or is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The OS watcher refused to register a directory.
    #[error("failed to subscribe to {}: {source}", path.display())]
    SubscriptionFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// A path could not be expressed relative to the watch root.
    #[error("cannot resolve {} relative to {}", path.display(), root.display())]
    PathResolution { path: PathBuf, root: PathBuf },

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
