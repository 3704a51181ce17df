//! Change events from directory watching.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};

/// A semantic change under the watch root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Absolute path of the affected entry.
    pub absolute_path: PathBuf,

    /// Path relative to the watch root, `/`-separated.
    pub relative_path: String,

    /// The kind of change.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Create a change event, resolving the relative path against `root`.
    pub fn new(kind: ChangeKind, root: &Path, absolute_path: impl Into<PathBuf>) -> Result<Self> {
        let absolute_path = absolute_path.into();
        let relative_path = relative_path(root, &absolute_path)?;

        Ok(Self {
            absolute_path,
            relative_path,
            kind,
        })
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.relative_path)
    }
}

/// Kind of change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Entry appeared (created or moved in).
    Created,

    /// File content was written.
    Modified,

    /// Entry disappeared (deleted or moved away).
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        };
        f.write_str(name)
    }
}

/// Operation reported by the OS watcher, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Create,
    Write,
    Remove,
    Rename,
    /// Permissions, timestamps, access. Never produces an event.
    Metadata,
    Other,
}

impl RawKind {
    /// Whether the entry at the path is gone (removed or renamed away).
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Remove | Self::Rename)
    }
}

/// A single path + operation pair taken from the OS queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: RawKind,
}

impl RawEvent {
    pub fn new(kind: RawKind, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Split a notify event into one raw event per path.
    ///
    /// A paired rename (`[from, to]`) yields nothing: the backend delivers
    /// the `From` and `To` halves separately as well. An unpaired rename of
    /// unknown direction is decided by whether the path still exists.
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        match event.kind {
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Vec::new(),
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::Any | RenameMode::Other)) => {
                event
                    .paths
                    .into_iter()
                    .map(|path| {
                        let kind = if path.exists() {
                            RawKind::Create
                        } else {
                            RawKind::Rename
                        };
                        Self::new(kind, path)
                    })
                    .collect()
            }
            kind => {
                let kind = RawKind::from(kind);
                event
                    .paths
                    .into_iter()
                    .map(|path| Self::new(kind, path))
                    .collect()
            }
        }
    }
}

impl From<notify::EventKind> for RawKind {
    fn from(kind: notify::EventKind) -> Self {
        match kind {
            notify::EventKind::Create(_) => Self::Create,
            notify::EventKind::Modify(modify_kind) => match modify_kind {
                ModifyKind::Name(RenameMode::From) => Self::Rename,
                ModifyKind::Name(RenameMode::To) => Self::Create,
                ModifyKind::Name(_) => Self::Rename,
                ModifyKind::Metadata(_) => Self::Metadata,
                ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other => Self::Write,
            },
            notify::EventKind::Remove(_) => Self::Remove,
            notify::EventKind::Access(_) => Self::Metadata,
            notify::EventKind::Any | notify::EventKind::Other => Self::Other,
        }
    }
}

/// Express `path` relative to `root` with `/` separators.
///
/// The root itself maps to the empty string. Paths outside the root, or
/// with components that are not valid UTF-8, cannot be resolved.
pub fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let resolution_error = || WatcherError::PathResolution {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };

    let stripped = path.strip_prefix(root).map_err(|_| resolution_error())?;

    let mut parts = Vec::new();
    for component in stripped.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(resolution_error)?),
            Component::CurDir => {}
            _ => return Err(resolution_error()),
        }
    }

    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_change_event_creation() {
        let event = ChangeEvent::new(ChangeKind::Created, Path::new("/w"), "/w/x/y.txt").unwrap();

        assert_eq!(event.kind, ChangeKind::Created);
        assert_eq!(event.absolute_path, Path::new("/w/x/y.txt"));
        assert_eq!(event.relative_path, "x/y.txt");
        assert_eq!(event.to_string(), "created x/y.txt");
    }

    #[test]
    fn test_relative_path_of_root_is_empty() {
        assert_eq!(relative_path(Path::new("/w"), Path::new("/w")).unwrap(), "");
    }

    #[test]
    fn test_relative_path_outside_root() {
        let err = relative_path(Path::new("/w"), Path::new("/other/file")).unwrap_err();
        assert!(matches!(err, WatcherError::PathResolution { .. }));
    }

    #[test]
    fn test_raw_kind_from_notify() {
        use notify::EventKind;

        assert_eq!(RawKind::from(EventKind::Create(CreateKind::File)), RawKind::Create);
        assert_eq!(
            RawKind::from(EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            RawKind::Write
        );
        assert_eq!(
            RawKind::from(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))),
            RawKind::Metadata
        );
        assert_eq!(
            RawKind::from(EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            RawKind::Rename
        );
        assert_eq!(
            RawKind::from(EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            RawKind::Create
        );
        assert_eq!(RawKind::from(EventKind::Remove(RemoveKind::Folder)), RawKind::Remove);
        assert_eq!(RawKind::from(EventKind::Access(AccessKind::Read)), RawKind::Metadata);
        assert_eq!(RawKind::from(EventKind::Any), RawKind::Other);
    }

    #[test]
    fn test_paired_rename_yields_nothing() {
        let event = notify::Event::new(notify::EventKind::Modify(ModifyKind::Name(
            RenameMode::Both,
        )))
        .add_path(PathBuf::from("/w/old"))
        .add_path(PathBuf::from("/w/new"));

        assert_eq!(RawEvent::from_notify(event), Vec::<RawEvent>::new());
    }

    #[test]
    fn test_rename_halves_map_to_removal_and_creation() {
        let from = notify::Event::new(notify::EventKind::Modify(ModifyKind::Name(
            RenameMode::From,
        )))
        .add_path(PathBuf::from("/w/old"));
        let to = notify::Event::new(notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(PathBuf::from("/w/new"));

        assert_eq!(
            RawEvent::from_notify(from),
            vec![RawEvent::new(RawKind::Rename, "/w/old")]
        );
        assert_eq!(
            RawEvent::from_notify(to),
            vec![RawEvent::new(RawKind::Create, "/w/new")]
        );
    }

    #[test]
    fn test_unpaired_rename_checks_existence() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let present = temp_dir.path().join("present");
        std::fs::write(&present, b"x").unwrap();
        let gone = temp_dir.path().join("gone");

        let event = notify::Event::new(notify::EventKind::Modify(ModifyKind::Name(
            RenameMode::Any,
        )))
        .add_path(present.clone())
        .add_path(gone.clone());

        assert_eq!(
            RawEvent::from_notify(event),
            vec![
                RawEvent::new(RawKind::Create, present),
                RawEvent::new(RawKind::Rename, gone),
            ]
        );
    }
}
