//! Apply Engine
//!
//! Moves the staged artifact over the installed one.
//!
//! On Unix `rename(2)` replaces the target atomically, so a single rename is
//! all that happens. Elsewhere the old artifact is removed first (best
//! effort) and the staged file is renamed into place; both outcomes are
//! reported so a caller can tell a partial failure from a clean install.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How the installed artifact gets replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStrategy {
    /// One rename that atomically replaces the target
    AtomicRename,
    /// Remove the installed artifact, then rename the staged one into place
    RemoveThenRename,
}

impl Default for ApplyStrategy {
    #[cfg(unix)]
    fn default() -> Self {
        Self::AtomicRename
    }

    #[cfg(not(unix))]
    fn default() -> Self {
        Self::RemoveThenRename
    }
}

/// Result of the removal step of `RemoveThenRename`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemovalOutcome {
    Removed,
    /// Nothing was installed at the target path
    NotPresent,
    Failed { reason: String },
}

/// What an apply did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub strategy: ApplyStrategy,
    /// `None` for `AtomicRename`, which has no removal step
    pub removal: Option<RemovalOutcome>,
    pub installed_path: PathBuf,
}

impl ApplyReport {
    /// True when no sub-operation failed
    pub fn is_clean(&self) -> bool {
        !matches!(self.removal, Some(RemovalOutcome::Failed { .. }))
    }
}

#[derive(Error, Debug)]
#[error("failed to move {} to {}: {source}", from.display(), to.display())]
pub struct ApplyError {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: io::Error,
    /// Removal outcome when the removal step ran before the rename failed
    pub removal: Option<RemovalOutcome>,
}

/// Replaces installed artifacts with staged ones
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyEngine {
    strategy: ApplyStrategy,
}

impl ApplyEngine {
    pub fn new(strategy: ApplyStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ApplyStrategy {
        self.strategy
    }

    /// Install `staged` at `install`
    pub fn apply(&self, staged: &Path, install: &Path) -> Result<ApplyReport, ApplyError> {
        let removal = match self.strategy {
            ApplyStrategy::AtomicRename => None,
            ApplyStrategy::RemoveThenRename => Some(remove_installed(install)),
        };

        if let Err(source) = fs::rename(staged, install) {
            return Err(ApplyError {
                from: staged.to_path_buf(),
                to: install.to_path_buf(),
                source,
                removal,
            });
        }

        Ok(ApplyReport {
            strategy: self.strategy,
            removal,
            installed_path: install.to_path_buf(),
        })
    }
}

fn remove_installed(install: &Path) -> RemovalOutcome {
    match fs::remove_file(install) {
        Ok(()) => RemovalOutcome::Removed,
        Err(e) if e.kind() == io::ErrorKind::NotFound => RemovalOutcome::NotPresent,
        Err(e) => RemovalOutcome::Failed {
            reason: e.to_string(),
        },
    }
}
