//! Logging and completion notification
//!
//! Every significant event goes to `tracing` and, when a log file is
//! configured, is appended to it as one line. Each phase operation ends by
//! handing one `Completion` to the registered sink.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::ErrorKind;

/// Which operation a completion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Check,
    /// Download and the apply it chains into
    Download,
    /// Standalone apply
    Apply,
}

/// The `(error, latestVersion)` pair delivered once per operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub operation: Operation,
    pub error: Option<ErrorKind>,
    pub latest_version: Option<String>,
}

impl Completion {
    pub fn is_success(&self) -> bool {
        self.error.map(|kind| !kind.is_failure()).unwrap_or(true)
    }
}

/// Receives completion events
pub trait NotificationSink: Send + Sync {
    fn notify(&self, completion: &Completion);
}

impl<F> NotificationSink for F
where
    F: Fn(&Completion) + Send + Sync,
{
    fn notify(&self, completion: &Completion) {
        self(completion)
    }
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Info,
    Warn,
    Error,
}

/// Event log mirrored to an optional append-only file
#[derive(Debug, Clone, Default)]
pub struct UpdateLog {
    file: Option<PathBuf>,
}

impl UpdateLog {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    /// Log through `tracing` only
    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.write(Level::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.write(Level::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.write(Level::Error, message.as_ref());
    }

    fn write(&self, level: Level, message: &str) {
        match level {
            Level::Info => tracing::info!(target: "updater", "{}", message),
            Level::Warn => tracing::warn!(target: "updater", "{}", message),
            Level::Error => tracing::error!(target: "updater", "{}", message),
        }

        let Some(path) = &self.file else {
            return;
        };
        let line = format!(
            "[{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            message
        );
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = result {
            tracing::warn!("Could not append to log file {}: {}", path.display(), e);
        }
    }
}
