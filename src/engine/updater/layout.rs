//! Install Layout
//!
//! Where the installed artifact lives and where everything around it goes:
//!
//! ```text
//! <install dir>/
//!   app.asar            installed artifact (replaced on apply)
//!   package.json        descriptor holding the local version
//!   update.asar         staged artifact
//!   updater-log.txt     log file
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_STAGED_FILE_NAME: &str = "update.asar";
pub const DEFAULT_DESCRIPTOR_NAME: &str = "package.json";

/// Reasons an installation cannot replace itself
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("install artifact not found: {0}")]
    ArtifactMissing(PathBuf),
    #[error("install artifact is not a regular file: {0}")]
    NotAFile(PathBuf),
    #[error("install artifact has no parent directory: {0}")]
    NoParentDir(PathBuf),
    #[error("not launched from {expected} (found {found})")]
    UnexpectedArtifact { expected: String, found: String },
}

/// Filesystem layout of an updatable installation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallLayout {
    /// The artifact replaced by an update
    pub path: PathBuf,
    /// Descriptor with a `version` field; defaults to `package.json`
    /// next to the artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<PathBuf>,
    #[serde(default = "default_staged_file_name")]
    pub staged_file_name: String,
    /// When set, the artifact's file name must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_artifact_name: Option<String>,
}

fn default_staged_file_name() -> String {
    DEFAULT_STAGED_FILE_NAME.to_string()
}

impl InstallLayout {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            descriptor: None,
            staged_file_name: default_staged_file_name(),
            expected_artifact_name: None,
        }
    }

    pub fn with_descriptor(mut self, descriptor: impl Into<PathBuf>) -> Self {
        self.descriptor = Some(descriptor.into());
        self
    }

    pub fn with_expected_artifact_name(mut self, name: impl Into<String>) -> Self {
        self.expected_artifact_name = Some(name.into());
        self
    }

    /// Directory containing the artifact
    pub fn install_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.descriptor
            .clone()
            .unwrap_or_else(|| self.install_dir().join(DEFAULT_DESCRIPTOR_NAME))
    }

    /// Where a downloaded artifact is staged
    pub fn staged_path(&self) -> PathBuf {
        self.install_dir().join(&self.staged_file_name)
    }

    /// Temporary name used while the staged artifact is being written
    pub fn partial_path(&self) -> PathBuf {
        self.install_dir()
            .join(format!("{}.partial", self.staged_file_name))
    }

    /// Resolve a relative path against the install directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.install_dir().join(path)
        }
    }

    /// Verify this installation can replace itself
    pub fn check_updatable(&self) -> Result<(), LayoutError> {
        if let Some(expected) = &self.expected_artifact_name {
            let found = self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if &found != expected {
                return Err(LayoutError::UnexpectedArtifact {
                    expected: expected.clone(),
                    found,
                });
            }
        }

        let metadata = fs::metadata(&self.path)
            .map_err(|_| LayoutError::ArtifactMissing(self.path.clone()))?;
        if !metadata.is_file() {
            return Err(LayoutError::NotAFile(self.path.clone()));
        }
        if !self.install_dir().is_dir() {
            return Err(LayoutError::NoParentDir(self.path.clone()));
        }
        Ok(())
    }

    /// Read the local version from the descriptor
    ///
    /// Returns `None` when the descriptor is missing, unreadable, or has no
    /// non-empty `version` field.
    pub fn read_local_version(&self) -> Option<String> {
        let path = self.descriptor_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Could not read descriptor {}: {}", path.display(), e);
                return None;
            }
        };
        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Descriptor {} is not valid JSON: {}", path.display(), e);
                return None;
            }
        };
        value
            .get("version")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths() {
        let layout = InstallLayout::new("/opt/app/resources/app.asar");
        assert_eq!(layout.install_dir(), PathBuf::from("/opt/app/resources"));
        assert_eq!(
            layout.staged_path(),
            PathBuf::from("/opt/app/resources/update.asar")
        );
        assert_eq!(
            layout.partial_path(),
            PathBuf::from("/opt/app/resources/update.asar.partial")
        );
        assert_eq!(
            layout.descriptor_path(),
            PathBuf::from("/opt/app/resources/package.json")
        );
        assert_eq!(
            layout.resolve(Path::new("updater-log.txt")),
            PathBuf::from("/opt/app/resources/updater-log.txt")
        );
        assert_eq!(
            layout.resolve(Path::new("/var/log/u.txt")),
            PathBuf::from("/var/log/u.txt")
        );
    }

    #[test]
    fn test_bare_file_name_uses_current_dir() {
        let layout = InstallLayout::new("app.asar");
        assert_eq!(layout.install_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_check_updatable() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("app.asar");

        let layout = InstallLayout::new(&artifact);
        assert_eq!(
            layout.check_updatable(),
            Err(LayoutError::ArtifactMissing(artifact.clone()))
        );

        fs::write(&artifact, b"v1").unwrap();
        assert!(layout.check_updatable().is_ok());

        let layout = InstallLayout::new(dir.path());
        assert!(matches!(layout.check_updatable(), Err(LayoutError::NotAFile(_))));
    }

    #[test]
    fn test_expected_artifact_name() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("app");
        fs::write(&artifact, b"v1").unwrap();

        let layout = InstallLayout::new(&artifact).with_expected_artifact_name("app.asar");
        assert!(matches!(
            layout.check_updatable(),
            Err(LayoutError::UnexpectedArtifact { .. })
        ));
    }

    #[test]
    fn test_read_local_version() {
        let dir = tempdir().unwrap();
        let layout = InstallLayout::new(dir.path().join("app.asar"));
        assert_eq!(layout.read_local_version(), None);

        fs::write(layout.descriptor_path(), r#"{"name": "app"}"#).unwrap();
        assert_eq!(layout.read_local_version(), None);

        fs::write(layout.descriptor_path(), r#"{"version": "  "}"#).unwrap();
        assert_eq!(layout.read_local_version(), None);

        fs::write(layout.descriptor_path(), r#"{"version": "1.0.0"}"#).unwrap();
        assert_eq!(layout.read_local_version(), Some("1.0.0".to_string()));
    }

    #[test]
    fn test_layout_deserialize_defaults() {
        let layout: InstallLayout = serde_json::from_str(r#"{"path": "/a/app.asar"}"#).unwrap();
        assert_eq!(layout.staged_file_name, DEFAULT_STAGED_FILE_NAME);
        assert!(layout.descriptor.is_none());
    }
}
