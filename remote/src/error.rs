//! Error types for remote backends.

use thiserror::Error;

/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors that can occur while talking to a remote backend.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Destination URL uses a scheme no backend handles.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Destination URL is malformed for its scheme.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// A remote path tried to leave the destination root.
    #[error("invalid remote path: {0}")]
    InvalidPath(String),

    /// A path component exists remotely but is not a directory.
    #[error("not a directory on remote: {0}")]
    NotADirectory(String),

    /// The server rejected the credentials.
    #[error("authentication failed for {user}@{host}")]
    AuthenticationFailed { user: String, host: String },

    /// No session could be established.
    #[error("not connected")]
    NotConnected,

    /// URL parse error.
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    /// SSH transport error.
    #[error("ssh error: {0}")]
    Ssh(#[from] russh::Error),

    /// SFTP protocol error.
    #[error("sftp error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    /// FTP protocol or transport error.
    #[error("ftp error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
