//! # Remote
//!
//! Storage backends that a watched directory tree is mirrored into.
//!
//! ## Features
//!
//! - **One capability interface**: [`RemoteFs`] covers directory creation,
//!   recursive removal, uploads and listings with forward-slash paths
//! - **Local destinations**: `file://` URLs and plain paths
//! - **SFTP destinations**: `sftp://` URLs, with lazy connect and reconnect
//! - **FTP destinations**: `ftp://` URLs, same connection policy
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Remote Backends                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  connect(destination) ──► Arc<dyn RemoteFs>                     │
//! │          │                      │                               │
//! │          ▼                      ▼                               │
//! │   file:// ─► LocalRemote   sftp:// ─► SftpRemote (russh)        │
//! │                            ftp://  ─► FtpRemote (suppaftp)      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod ftp;
pub mod local;
pub mod sftp;

use std::sync::Arc;

use tracing::debug;
use url::Url;

pub use backend::{EntryKind, RemoteEntry, RemoteFs, ancestors, components, split_parent};
pub use error::{RemoteError, Result};
pub use ftp::{FtpRemote, FtpTarget};
pub use local::LocalRemote;
pub use sftp::{SftpRemote, SftpTarget};

/// Build the backend for a destination.
///
/// `file://`, `sftp://` and `ftp://` URLs are recognised; a destination without a
/// scheme is taken as a local directory path. Nothing is contacted yet.
pub fn connect(destination: &str) -> Result<Arc<dyn RemoteFs>> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(RemoteError::InvalidDestination(
            "destination is empty".to_string(),
        ));
    }

    let url = match Url::parse(destination) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            debug!("Treating destination as a local path: {destination}");
            return Ok(Arc::new(LocalRemote::new(destination)));
        }
        Err(e) => return Err(e.into()),
    };

    match url.scheme() {
        "file" => {
            let base = url.to_file_path().map_err(|()| {
                RemoteError::InvalidDestination(format!("not a local path: {destination}"))
            })?;
            Ok(Arc::new(LocalRemote::new(base)))
        }
        "sftp" => Ok(Arc::new(SftpRemote::from_url(&url)?)),
        "ftp" => Ok(Arc::new(FtpRemote::from_url(&url)?)),
        other => Err(RemoteError::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_connect_file_url() {
        let remote = connect("file:///tmp/mirror").unwrap();
        assert_eq!(remote.name(), "file");
    }

    #[test]
    fn test_connect_plain_path() {
        let remote = connect("relative/mirror").unwrap();
        assert_eq!(remote.name(), "file");
    }

    #[test]
    fn test_connect_sftp_url_is_lazy() {
        let remote = connect("sftp://deploy@unreachable.invalid/srv").unwrap();
        assert_eq!(remote.name(), "sftp");
    }

    #[test]
    fn test_connect_ftp_url_is_lazy() {
        let remote = connect("ftp://deploy@unreachable.invalid/pub").unwrap();
        assert_eq!(remote.name(), "ftp");
    }

    #[test]
    fn test_connect_rejects_unknown_scheme() {
        assert!(matches!(
            connect("gopher://host/dir"),
            Err(RemoteError::UnsupportedScheme(scheme)) if scheme == "gopher"
        ));
    }

    #[test]
    fn test_connect_rejects_empty_destination() {
        assert!(matches!(
            connect("  "),
            Err(RemoteError::InvalidDestination(_))
        ));
    }
}
