//! Update Error Types
//!
//! `ErrorKind` is the closed taxonomy reported to notification sinks.
//! `UpdateError` is what the phase operations return.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::state::Phase;

/// Outcome kinds surfaced through the completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The local version is missing from the application descriptor
    VersionNotSpecified,
    /// The installation cannot replace itself
    UpdateSourceUnreachable,
    /// Transport failure on the manifest request
    CannotConnectToApi,
    /// The manifest offers no download. Not a failure.
    NoUpdateAvailable,
    /// Manifest body unparseable or missing `latestVersion`
    ApiResponseNotValid,
    /// Transport failure on the artifact download
    UpdateFileNotFound,
    /// Writing the staged artifact failed
    FailedToDownloadUpdate,
    /// Moving the staged artifact into the install path failed
    FailedToApplyUpdate,
}

impl ErrorKind {
    /// Stable snake_case code, as written to logs and JSON output
    pub fn code(&self) -> &'static str {
        match self {
            Self::VersionNotSpecified => "version_not_specified",
            Self::UpdateSourceUnreachable => "update_source_unreachable",
            Self::CannotConnectToApi => "cannot_connect_to_api",
            Self::NoUpdateAvailable => "no_update_available",
            Self::ApiResponseNotValid => "api_response_not_valid",
            Self::UpdateFileNotFound => "update_file_not_found",
            Self::FailedToDownloadUpdate => "failed_to_download_update",
            Self::FailedToApplyUpdate => "failed_to_apply_update",
        }
    }

    /// Whether this kind ends the session in `Failed`
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::NoUpdateAvailable)
    }

    /// Whether a later attempt may succeed without fixing the installation
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::CannotConnectToApi | Self::UpdateFileNotFound)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors returned by the phase operations
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("{kind}: {message}")]
    Failed { kind: ErrorKind, message: String },

    /// Calling a phase out of order. This is a caller bug: it is never
    /// reported to the notification sink and leaves the session untouched.
    #[error("{operation} requires phase {expected}, but session is {actual}")]
    InvalidPhase {
        operation: &'static str,
        expected: Phase,
        actual: Phase,
    },
}

impl UpdateError {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// The reported kind, or `None` for a precondition violation
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            Self::InvalidPhase { .. } => None,
        }
    }

    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::InvalidPhase { .. })
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;
