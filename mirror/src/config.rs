//! Configuration for the mirror service.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use treemirror_directory_watcher::WatchConfig;

use crate::error::{MirrorError, Result};

/// What to mirror and where to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Local directory to watch.
    pub watch_path: PathBuf,

    /// Destination URL, e.g. `sftp://user@host/srv/www` or `file:///mnt/backup`.
    pub destination: String,

    /// Paths relative to `watch_path` that are neither watched nor mirrored.
    pub excludes: Vec<String>,

    /// Verbose logging.
    pub debug: bool,
}

impl MirrorConfig {
    /// Create a new configuration with no exclusions.
    pub fn new(watch_path: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
        Self {
            watch_path: watch_path.into(),
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Add a root-relative path to exclude.
    pub fn exclude(mut self, path: impl Into<String>) -> Self {
        self.excludes.push(path.into());
        self
    }

    /// Enable or disable verbose logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Load a configuration from a TOML file.
    ///
    /// Every key is optional so that command line flags can fill the gaps;
    /// call [`Self::validate`] once everything is merged.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MirrorError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Check that the required settings are present.
    pub fn validate(&self) -> Result<()> {
        if self.watch_path.as_os_str().is_empty() {
            return Err(MirrorError::Config("no directory to watch".to_string()));
        }
        if self.destination.trim().is_empty() {
            return Err(MirrorError::Config("no destination".to_string()));
        }
        Ok(())
    }

    /// The watcher configuration for this mirror.
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig::new(&self.watch_path).with_excludes(self.excludes.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_validate_requires_root_and_destination() {
        assert!(matches!(
            MirrorConfig::new("", "file:///tmp/out").validate(),
            Err(MirrorError::Config(_))
        ));
        assert!(matches!(
            MirrorConfig::new("/srv/site", " ").validate(),
            Err(MirrorError::Config(_))
        ));
        assert!(MirrorConfig::new("/srv/site", "file:///tmp/out").validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mirror.toml");
        std::fs::write(
            &path,
            r#"
watch_path = "/srv/site"
destination = "sftp://deploy@files.example.com/srv/www"
excludes = [".git", "node_modules"]
"#,
        )
        .unwrap();

        let config = MirrorConfig::from_toml_file(&path).unwrap();

        assert_eq!(
            config,
            MirrorConfig::new("/srv/site", "sftp://deploy@files.example.com/srv/www")
                .exclude(".git")
                .exclude("node_modules")
        );
    }

    #[test]
    fn test_partial_toml_file_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mirror.toml");
        std::fs::write(&path, "debug = true\n").unwrap();

        let config = MirrorConfig::from_toml_file(&path).unwrap();

        assert!(config.debug);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unreadable_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            MirrorConfig::from_toml_file(&dir.path().join("missing.toml")),
            Err(MirrorError::Config(_))
        ));
    }

    #[test]
    fn test_watch_config_carries_excludes() {
        let config = MirrorConfig::new("/srv/site", "file:///tmp/out").exclude("cache");
        let watch = config.watch_config();

        assert_eq!(watch.root, PathBuf::from("/srv/site"));
        assert_eq!(watch.excludes, vec!["cache".to_string()]);
    }
}
