//! Subscription bookkeeping and notification classification.
//!
//! [`WatchTree`] owns the OS watcher and the set of directories registered
//! with it. It is driven by exactly one task, so nothing here is locked.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::config::ExclusionSet;
use crate::error::{Result, WatcherError};
use crate::event::{ChangeEvent, ChangeKind, RawEvent, RawKind};

/// Per-directory registration with the OS notification primitive.
///
/// Registrations are not recursive: every subdirectory is subscribed on its
/// own.
pub trait SubscriptionBackend: Send + 'static {
    /// Start receiving notifications for the direct children of `dir`.
    fn subscribe(&mut self, dir: &Path) -> notify::Result<()>;

    /// Stop receiving notifications for `dir`.
    fn unsubscribe(&mut self, dir: &Path) -> notify::Result<()>;
}

impl SubscriptionBackend for RecommendedWatcher {
    fn subscribe(&mut self, dir: &Path) -> notify::Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)
    }

    fn unsubscribe(&mut self, dir: &Path) -> notify::Result<()> {
        self.unwatch(dir)
    }
}

impl<B: SubscriptionBackend + ?Sized> SubscriptionBackend for Box<B> {
    fn subscribe(&mut self, dir: &Path) -> notify::Result<()> {
        (**self).subscribe(dir)
    }

    fn unsubscribe(&mut self, dir: &Path) -> notify::Result<()> {
        (**self).unsubscribe(dir)
    }
}

/// How registration failures during a walk are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkMode {
    /// Startup: the first failure aborts.
    Strict,
    /// After a creation event: failures are logged and the subtree is left
    /// unobserved.
    Lenient,
}

/// The live set of subscriptions under a watch root.
pub struct WatchTree<B> {
    root: PathBuf,
    exclusions: ExclusionSet,
    backend: B,
    subscribed: BTreeSet<PathBuf>,
    /// Directories whose removal was already reported. A directory's own
    /// watch reports its removal too, so the second report is dropped until
    /// the path reappears.
    released: BTreeSet<PathBuf>,
}

impl<B: SubscriptionBackend> WatchTree<B> {
    /// Create an empty tree. Nothing is subscribed until [`Self::subscribe_all`].
    pub fn new(root: impl Into<PathBuf>, exclusions: ExclusionSet, backend: B) -> Self {
        Self {
            root: root.into(),
            exclusions,
            backend,
            subscribed: BTreeSet::new(),
            released: BTreeSet::new(),
        }
    }

    /// Subscribe the root and every non-excluded directory beneath it.
    ///
    /// Any failure is returned, leaving whatever was registered so far in
    /// place.
    pub fn subscribe_all(&mut self) -> Result<usize> {
        let root = self.root.clone();
        self.subscribe_recursive(&root, WalkMode::Strict)
    }

    /// Apply one raw notification to the subscription set and classify it.
    ///
    /// Returns the event to emit, if any.
    pub fn process(&mut self, raw: RawEvent) -> Option<ChangeEvent> {
        if raw.kind == RawKind::Metadata {
            return None;
        }
        if raw.path.as_os_str().is_empty() || raw.path == Path::new(".") {
            return None;
        }
        if self.exclusions.is_excluded(&raw.path) {
            trace!("Dropping event for excluded path: {}", raw.path.display());
            return None;
        }

        if raw.kind.is_removal() {
            if self.released.contains(&raw.path) {
                trace!("Dropping repeated removal: {}", raw.path.display());
                return None;
            }
            let removed = self.unsubscribe_under(&raw.path);
            if removed > 0 {
                debug!(
                    "Dropped {removed} subscription(s) under {}",
                    raw.path.display()
                );
            }
        } else {
            self.released.remove(&raw.path);

            if is_directory(&raw.path) {
                match raw.kind {
                    RawKind::Create => {
                        let path = raw.path.clone();
                        match self.subscribe_recursive(&path, WalkMode::Lenient) {
                            Ok(added) => {
                                debug!("Subscribed {added} new director(ies) under {}", path.display());
                            }
                            Err(e) => {
                                warn!("Cannot observe new directory {}: {e}", path.display());
                            }
                        }
                    }
                    RawKind::Write => {
                        // Echo of a child being created; the child reports itself.
                        return None;
                    }
                    _ => {}
                }
            }
        }

        let kind = match raw.kind {
            RawKind::Remove | RawKind::Rename => ChangeKind::Removed,
            RawKind::Create => ChangeKind::Created,
            RawKind::Write => ChangeKind::Modified,
            RawKind::Metadata | RawKind::Other => return None,
        };

        if raw.path == self.root {
            if kind == ChangeKind::Removed {
                warn!("Watch root {} was removed", self.root.display());
            }
            return None;
        }

        match ChangeEvent::new(kind, &self.root, raw.path) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Dropping event: {e}");
                None
            }
        }
    }

    /// Release every subscription.
    pub fn shutdown(&mut self) {
        let root = self.root.clone();
        let removed = self.unsubscribe_under(&root);
        self.released.clear();
        debug!("Released {removed} subscription(s)");
    }

    /// Check if a directory is currently subscribed.
    pub fn is_subscribed(&self, dir: &Path) -> bool {
        self.subscribed.contains(dir)
    }

    /// Currently subscribed directories, in path order.
    pub fn subscriptions(&self) -> impl Iterator<Item = &Path> {
        self.subscribed.iter().map(PathBuf::as_path)
    }

    /// The watch root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The underlying OS backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn subscribe_recursive(&mut self, dir: &Path, mode: WalkMode) -> Result<usize> {
        if self.exclusions.is_excluded(dir) {
            return Ok(0);
        }

        let exclusions = &self.exclusions;
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.file_type().is_dir() && !exclusions.is_excluded(entry.path()));

        let mut added = 0;
        let mut failure = None;

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                    let vanished = e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound);
                    if mode == WalkMode::Strict {
                        failure = Some(WatcherError::Io(io::Error::from(e)));
                        break;
                    }
                    if vanished {
                        debug!("Directory vanished before it could be walked: {}", path.display());
                    } else {
                        warn!("Cannot walk {}: {e}", path.display());
                    }
                    continue;
                }
            };

            let path = entry.into_path();
            if self.subscribed.contains(&path) {
                continue;
            }

            match self.backend.subscribe(&path) {
                Ok(()) => {
                    trace!("Subscribed: {}", path.display());
                    self.released.remove(&path);
                    self.subscribed.insert(path);
                    added += 1;
                }
                Err(source) => match mode {
                    WalkMode::Strict => {
                        failure = Some(WatcherError::SubscriptionFailed { path, source });
                        break;
                    }
                    WalkMode::Lenient => {
                        warn!("Failed to subscribe {}, leaving it unobserved: {source}", path.display());
                    }
                },
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(added),
        }
    }

    fn unsubscribe_under(&mut self, path: &Path) -> usize {
        let stale: Vec<PathBuf> = self
            .subscribed
            .iter()
            .filter(|dir| dir.starts_with(path))
            .cloned()
            .collect();

        for dir in &stale {
            self.subscribed.remove(dir);
            self.released.insert(dir.clone());
            // The OS usually drops the watch itself once the directory is gone.
            if let Err(e) = self.backend.unsubscribe(dir) {
                trace!("Unsubscribe {} failed: {e}", dir.display());
            }
        }

        stale.len()
    }
}

fn is_directory(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(metadata) => metadata.is_dir(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            debug!("Cannot stat {}: {e}", path.display());
            false
        }
    }
}
