//! Reconciles local paths with the remote copy.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use treemirror_directory_watcher::{ChangeEvent, DirectoryWatcher, ExclusionSet, relative_path};
use treemirror_remote::RemoteFs;

use crate::error::Result;

/// What a local path currently is.
enum LocalEntry {
    Absent,
    File,
    Directory,
    /// Links to directories, sockets and the like. Never mirrored.
    Skipped(&'static str),
}

/// Makes the remote copy of a path match what is on local disk.
///
/// Local state is always the source of truth: whatever a path is now decides
/// the remote operation, whatever event led here.
pub struct Mirror {
    /// Local root, mapped to the remote root.
    root: PathBuf,

    /// Subtrees that are never mirrored.
    exclusions: ExclusionSet,

    /// Remote backend.
    remote: Arc<dyn RemoteFs>,
}

impl Mirror {
    pub fn new(root: impl Into<PathBuf>, exclusions: ExclusionSet, remote: Arc<dyn RemoteFs>) -> Self {
        Self {
            root: root.into(),
            exclusions,
            remote,
        }
    }

    /// Mirror the tree a watcher observes, with the same root and exclusions.
    pub fn for_watcher(watcher: &DirectoryWatcher, remote: Arc<dyn RemoteFs>) -> Self {
        Self::new(watcher.root(), watcher.exclusions().clone(), remote)
    }

    /// The local root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy the whole tree to the remote.
    pub async fn sync_all(&self) -> Result<()> {
        info!(
            "Syncing {} to {} remote",
            self.root.display(),
            self.remote.name()
        );
        self.sync(&self.root).await?;
        info!("Initial sync complete");
        Ok(())
    }

    /// Bring the remote in line with a change.
    pub async fn apply(&self, event: &ChangeEvent) -> Result<()> {
        debug!("Applying {event}");
        self.sync(&event.absolute_path).await
    }

    /// Make the remote copy of `path` match local state.
    ///
    /// A missing path is removed remotely, whatever it is there. A directory
    /// is created along with everything beneath it, parents before children.
    /// A file is uploaded over any previous copy. The first failure stops the
    /// walk and is returned.
    pub async fn sync(&self, path: &Path) -> Result<()> {
        let mut pending = vec![path.to_path_buf()];

        while let Some(current) = pending.pop() {
            if self.exclusions.is_excluded(&current) {
                debug!("Skipping excluded path: {}", current.display());
                continue;
            }

            let relative = relative_path(&self.root, &current)?;

            match local_entry(&current).await? {
                LocalEntry::Absent => self.remote.remove(&relative).await?,
                LocalEntry::File => {
                    self.remote.upload_file(&relative, &current).await?;
                    info!("Uploaded: {relative}");
                }
                LocalEntry::Directory => {
                    if !relative.is_empty() {
                        self.remote.make_dir(&relative).await?;
                        debug!("Created directory: {relative}");
                    }
                    let mut children = read_children(&current).await?;
                    children.sort_unstable();
                    // Reversed so the stack hands them out in name order.
                    pending.extend(children.into_iter().rev());
                }
                LocalEntry::Skipped(what) => {
                    debug!("Not mirroring {what}: {}", current.display());
                }
            }
        }

        Ok(())
    }
}

async fn local_entry(path: &Path) -> Result<LocalEntry> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LocalEntry::Absent),
        Err(e) => return Err(e.into()),
    };

    let file_type = metadata.file_type();
    if file_type.is_dir() {
        return Ok(LocalEntry::Directory);
    }
    if file_type.is_file() {
        return Ok(LocalEntry::File);
    }
    if !file_type.is_symlink() {
        return Ok(LocalEntry::Skipped("special file"));
    }

    // Links are mirrored as the file they point to.
    match fs::metadata(path).await {
        Ok(target) if target.is_file() => Ok(LocalEntry::File),
        Ok(target) if target.is_dir() => Ok(LocalEntry::Skipped("link to directory")),
        Ok(_) => Ok(LocalEntry::Skipped("link to special file")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LocalEntry::Absent),
        Err(e) => Err(e.into()),
    }
}

async fn read_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        children.push(entry.path());
    }
    Ok(children)
}
