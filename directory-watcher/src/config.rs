//! Configuration types for directory watching.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for the watched tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root of the tree to watch.
    pub root: PathBuf,

    /// Paths to exclude, relative to `root`.
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl WatchConfig {
    /// Create a new watch config with no exclusions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: Vec::new(),
        }
    }

    /// Add a root-relative path to exclude.
    pub fn exclude(mut self, path: impl Into<String>) -> Self {
        self.excludes.push(path.into());
        self
    }

    /// Add several root-relative paths to exclude.
    pub fn with_excludes<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(paths.into_iter().map(Into::into));
        self
    }
}

/// Absolute path prefixes that are never watched nor mirrored.
///
/// Matching is component-bounded: excluding `build` hides `build` and
/// `build/out.o`, but not `builder.rs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    prefixes: Vec<PathBuf>,
}

impl ExclusionSet {
    /// Resolve root-relative exclusion paths against `root`.
    ///
    /// Empty entries and entries that climb out of the root with `..` are
    /// ignored, since neither names a subtree of the root.
    pub fn new<S: AsRef<str>>(root: &Path, excludes: &[S]) -> Self {
        let mut prefixes = Vec::with_capacity(excludes.len());

        for exclude in excludes {
            let exclude = exclude.as_ref();
            let mut relative = PathBuf::new();
            let mut escapes = false;

            for component in Path::new(exclude).components() {
                match component {
                    Component::Normal(part) => relative.push(part),
                    Component::ParentDir => escapes = true,
                    Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
                }
            }

            if escapes || relative.as_os_str().is_empty() {
                warn!("Ignoring exclude pattern that names no subtree of the root: {exclude:?}");
                continue;
            }

            prefixes.push(root.join(relative));
        }

        Self { prefixes }
    }

    /// Check if a path is excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }

    /// The resolved absolute prefixes.
    pub fn prefixes(&self) -> &[PathBuf] {
        &self.prefixes
    }

    /// Whether no exclusions are configured.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_watch_config_creation() {
        let config = WatchConfig::new("/w").exclude(".git").with_excludes(["tmp", "build"]);

        assert_eq!(config.root, Path::new("/w"));
        assert_eq!(config.excludes, vec![".git", "tmp", "build"]);
    }

    #[test]
    fn test_exclusion_is_component_bounded() {
        let set = ExclusionSet::new(Path::new("/w"), &["build"]);

        assert!(set.is_excluded(Path::new("/w/build")));
        assert!(set.is_excluded(Path::new("/w/build/out.o")));
        assert!(!set.is_excluded(Path::new("/w/builder.rs")));
        assert!(!set.is_excluded(Path::new("/w/src/build")));
        assert!(!set.is_excluded(Path::new("/w")));
    }

    #[test]
    fn test_exclusion_normalizes_patterns() {
        let set = ExclusionSet::new(Path::new("/w"), &["./a/b/", "/c", "d/../e", ""]);

        assert_eq!(
            set.prefixes(),
            &[PathBuf::from("/w/a/b"), PathBuf::from("/w/c")]
        );
    }

    #[test]
    fn test_empty_exclusion_set() {
        let set = ExclusionSet::new::<&str>(Path::new("/w"), &[]);

        assert!(set.is_empty());
        assert!(!set.is_excluded(Path::new("/w/anything")));
    }
}
