//! The capability interface every remote backend implements.
//!
//! Paths handed to a backend are relative to the destination root and always
//! use `/` separators, whatever the host platform. The empty path names the
//! destination root itself.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{RemoteError, Result};

/// Kind of an entry in a remote listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks and anything else that is removed like a file.
    Other,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Trait for remote storage backends.
///
/// Every operation is idempotent with respect to state that already holds:
/// creating an existing directory or removing an absent path succeeds.
/// Connection handling, including reconnects, is the backend's business.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Create a directory and any missing ancestors.
    async fn make_dir(&self, path: &str) -> Result<()>;

    /// Remove a directory and everything beneath it.
    async fn remove_dir(&self, path: &str) -> Result<()>;

    /// Upload a local file, replacing any remote content. Missing parent
    /// directories are created.
    async fn upload_file(&self, remote_path: &str, local_path: &Path) -> Result<()>;

    /// Remove a single file.
    async fn remove_file(&self, path: &str) -> Result<()>;

    /// List a directory. An absent directory lists as empty.
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Find out what `path` currently is on the remote, by listing its
    /// parent directory.
    async fn lookup(&self, path: &str) -> Result<Option<EntryKind>> {
        let (parent, name) = split_parent(path);
        if name.is_empty() {
            return Ok(None);
        }

        let entries = self.list_dir(parent).await?;
        Ok(entries
            .into_iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.kind))
    }

    /// Remove whatever `path` is on the remote: a directory recursively,
    /// anything else as a file. Nothing happens if it is absent.
    async fn remove(&self, path: &str) -> Result<()> {
        match self.lookup(path).await? {
            Some(EntryKind::Directory) => {
                self.remove_dir(path).await?;
                info!("Removed directory: {path}");
            }
            Some(EntryKind::File | EntryKind::Other) => {
                self.remove_file(path).await?;
                info!("Removed file: {path}");
            }
            None => debug!("Already absent on remote: {path}"),
        }
        Ok(())
    }
}

/// Split a relative path into its parent and final component.
///
/// `"a/b/c"` splits into `("a/b", "c")`, `"c"` into `("", "c")`.
pub fn split_parent(path: &str) -> (&str, &str) {
    let path = path.trim_end_matches('/');
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

/// Every directory from the top down to `path` itself.
///
/// `"a/b/c"` yields `["a", "a/b", "a/b/c"]`.
pub fn ancestors(path: &str) -> Vec<&str> {
    let path = path.trim_matches('/');
    if path.is_empty() {
        return Vec::new();
    }

    let mut dirs: Vec<&str> = path
        .match_indices('/')
        .map(|(index, _)| &path[..index])
        .collect();
    dirs.push(path);
    dirs
}

/// Split a relative path into its components, refusing anything that could
/// leave the destination root.
pub fn components(path: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(RemoteError::InvalidPath(path.to_string())),
            part => parts.push(part),
        }
    }
    Ok(parts)
}
