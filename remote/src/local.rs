//! Backend that mirrors into a directory on a local or mounted filesystem.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::backend::{EntryKind, RemoteEntry, RemoteFs, components};
use crate::error::Result;

/// A `file://` destination.
#[derive(Debug, Clone)]
pub struct LocalRemote {
    base: PathBuf,
}

impl LocalRemote {
    /// Create a backend rooted at `base`. The directory is created on the
    /// first write if it does not exist yet.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.base.clone();
        resolved.extend(components(path)?);
        Ok(resolved)
    }
}

#[async_trait]
impl RemoteFs for LocalRemote {
    fn name(&self) -> &str {
        "file"
    }

    async fn make_dir(&self, path: &str) -> Result<()> {
        fs::create_dir_all(self.resolve(path)?).await?;
        Ok(())
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        match fs::remove_dir_all(self.resolve(path)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Directory already absent: {path}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upload_file(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        let target = self.resolve(remote_path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(local_path, &target).await?;
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        match fs::remove_file(self.resolve(path)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("File already absent: {path}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let mut dir = match fs::read_dir(self.resolve(path)?).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            entries.push(RemoteEntry::new(
                entry.file_name().to_string_lossy().into_owned(),
                kind,
            ));
        }
        Ok(entries)
    }
}
