//! Update Session State Machine
//!
//! One `UpdateSession` is created per update attempt and passed by `&mut`
//! through check, download and apply. Transitions only move forward;
//! a failure moves to `Failed` from any phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::ErrorKind;
use super::manifest::RemoteManifest;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Checking,
    /// Manifest with a download offer is held
    Checked,
    Downloading,
    /// Artifact staged on disk, ready to apply
    Downloaded,
    Applying,
    /// Up to date, or update installed
    Done,
    Failed,
}

impl Phase {
    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Checking => 1,
            Self::Checked => 2,
            Self::Downloading => 3,
            Self::Downloaded => 4,
            Self::Applying => 5,
            Self::Done => 6,
            Self::Failed => 7,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Checked => "checked",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Applying => "applying",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State of a single update attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSession {
    phase: Phase,
    local_version: String,
    /// Refresh `local_version` from the install descriptor on every check
    #[serde(default)]
    from_descriptor: bool,
    manifest: Option<RemoteManifest>,
    staged_file: Option<PathBuf>,
    last_error: Option<ErrorKind>,
    last_check: Option<DateTime<Utc>>,
}

impl UpdateSession {
    /// Start a session for the given installed version
    pub fn new(local_version: impl Into<String>) -> Self {
        Self {
            phase: Phase::Idle,
            local_version: local_version.into(),
            from_descriptor: false,
            manifest: None,
            staged_file: None,
            last_error: None,
            last_check: None,
        }
    }

    /// Session whose version tracks the install descriptor
    pub(crate) fn from_descriptor(local_version: impl Into<String>) -> Self {
        Self {
            from_descriptor: true,
            ..Self::new(local_version)
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn local_version(&self) -> &str {
        &self.local_version
    }

    pub fn manifest(&self) -> Option<&RemoteManifest> {
        self.manifest.as_ref()
    }

    /// Staged artifact path; set once the session reached `Downloaded`
    pub fn staged_file(&self) -> Option<&Path> {
        self.staged_file.as_deref()
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.last_check
    }

    /// Version offered by the held manifest
    pub fn latest_version(&self) -> Option<&str> {
        self.manifest.as_ref().map(|m| m.latest_version.as_str())
    }

    /// Whether `check` re-reads the version from the install descriptor
    pub fn tracks_descriptor(&self) -> bool {
        self.from_descriptor
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Failed)
    }

    /// Begin a new check, discarding anything a previous check produced
    pub(crate) fn start_checking(&mut self) {
        self.phase = Phase::Checking;
        self.manifest = None;
        self.staged_file = None;
        self.last_error = None;
        self.last_check = Some(Utc::now());
    }

    pub(crate) fn set_local_version(&mut self, version: String) {
        self.local_version = version;
    }

    pub(crate) fn mark_checked(&mut self, manifest: RemoteManifest) {
        self.advance(Phase::Checked);
        self.manifest = Some(manifest);
    }

    pub(crate) fn mark_up_to_date(&mut self) {
        self.advance(Phase::Done);
        self.manifest = None;
    }

    pub(crate) fn start_downloading(&mut self) {
        self.advance(Phase::Downloading);
    }

    pub(crate) fn mark_downloaded(&mut self, staged_file: PathBuf) {
        self.advance(Phase::Downloaded);
        self.staged_file = Some(staged_file);
    }

    pub(crate) fn start_applying(&mut self) {
        self.advance(Phase::Applying);
    }

    pub(crate) fn mark_applied(&mut self) {
        self.advance(Phase::Done);
    }

    pub(crate) fn mark_failed(&mut self, kind: ErrorKind) {
        self.phase = Phase::Failed;
        self.last_error = Some(kind);
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            next.rank() > self.phase.rank(),
            "phase must move forward: {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }
}
