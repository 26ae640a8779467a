//! Update Agent
//!
//! Drives an `UpdateSession` through check → download → apply.
//!
//! Each operation logs one line per outcome, hands exactly one `Completion`
//! to the sink, and returns the same outcome as a `Result`. A successful
//! download chains straight into apply; callers never observe a staged but
//! unapplied artifact unless they drive `apply` themselves.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::apply::{ApplyEngine, ApplyReport, RemovalOutcome};
use super::error::{ErrorKind, Result, UpdateError};
use super::layout::InstallLayout;
use super::manifest::RemoteManifest;
use super::notify::{Completion, NotificationSink, Operation, UpdateLog};
use super::state::{Phase, UpdateSession};
use super::transport::{ReqwestTransport, RequestOptions, Transport, TransportError};
use super::version::VersionPolicy;
use crate::engine::config::UpdaterConfig;

/// What a successful check found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The server offers `latest_version`; the session holds the manifest
    UpdateAvailable { latest_version: String },
    /// Nothing to install
    UpToDate { latest_version: String },
}

impl CheckOutcome {
    pub fn latest_version(&self) -> &str {
        match self {
            Self::UpdateAvailable { latest_version } | Self::UpToDate { latest_version } => {
                latest_version
            }
        }
    }

    /// The kind reported to the sink: `NoUpdateAvailable` when up to date
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::UpdateAvailable { .. } => None,
            Self::UpToDate { .. } => Some(ErrorKind::NoUpdateAvailable),
        }
    }
}

/// Self-update agent for one installation
pub struct Updater<T: Transport> {
    api: String,
    request_options: RequestOptions,
    layout: InstallLayout,
    policy: VersionPolicy,
    engine: ApplyEngine,
    transport: T,
    log: UpdateLog,
    sink: Option<Box<dyn NotificationSink>>,
}

impl Updater<ReqwestTransport> {
    /// Create an updater talking HTTP through `reqwest`
    pub fn from_config(config: &UpdaterConfig) -> std::result::Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.request_options)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Updater<T> {
    /// Create an updater over any transport
    pub fn with_transport(config: &UpdaterConfig, transport: T) -> Self {
        Self {
            api: config.api.clone(),
            request_options: config.request_options.clone(),
            layout: config.install.clone(),
            policy: config.policy.version,
            engine: ApplyEngine::new(config.policy.apply_strategy),
            transport,
            log: UpdateLog::new(config.log_path()),
            sink: None,
        }
    }

    /// Register the completion callback
    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn log(&self) -> &UpdateLog {
        &self.log
    }

    /// Start a session for the version found in the install descriptor
    ///
    /// The descriptor is read again at the start of every `check`, so a
    /// version written after the session was created is picked up. A missing
    /// version makes that check fail with `VersionNotSpecified`.
    pub fn start_session(&self) -> UpdateSession {
        let version = self.layout.read_local_version().unwrap_or_default();
        self.log.info(format!("Local version: {}", display_version(&version)));
        UpdateSession::from_descriptor(version)
    }

    /// Ask the manifest endpoint whether an update is available
    pub async fn check(&self, session: &mut UpdateSession) -> Result<CheckOutcome> {
        session.start_checking();
        if session.tracks_descriptor() {
            let current = self.layout.read_local_version().unwrap_or_default();
            if current != session.local_version() {
                self.log.info(format!("Local version: {}", display_version(&current)));
                session.set_local_version(current);
            }
        }

        let local_version = session.local_version().trim().to_string();
        if local_version.is_empty() {
            return Err(self.fail(
                session,
                Operation::Check,
                ErrorKind::VersionNotSpecified,
                "The \"version\" property is not specified in the application descriptor".to_string(),
            ));
        }

        if let Err(e) = self.layout.check_updatable() {
            return Err(self.fail(
                session,
                Operation::Check,
                ErrorKind::UpdateSourceUnreachable,
                format!("Installation cannot update itself: {}", e),
            ));
        }

        let body = self.request_options.manifest_body(&local_version);
        let payload = match self.transport.post(&self.api, &body).await {
            Ok(payload) => payload,
            Err(e) => {
                return Err(self.fail(
                    session,
                    Operation::Check,
                    ErrorKind::CannotConnectToApi,
                    format!("Could not connect, {}", e),
                ));
            }
        };
        self.log.info(format!("Connected to {}", self.api));

        let manifest = match RemoteManifest::from_payload(&payload) {
            Ok(manifest) => manifest,
            Err(e) => {
                return Err(self.fail(
                    session,
                    Operation::Check,
                    ErrorKind::ApiResponseNotValid,
                    format!("API response is not valid: {}", e),
                ));
            }
        };
        let latest_version = manifest.latest_version.clone();

        if !manifest.has_update() {
            self.log.info(format!("No updates available (latest {})", latest_version));
            return Ok(self.up_to_date(session, latest_version));
        }

        if !self.policy.accepts(&local_version, &latest_version) {
            self.log.info(format!(
                "Ignoring offered version {}: not newer than {}",
                latest_version, local_version
            ));
            return Ok(self.up_to_date(session, latest_version));
        }

        self.log.info(format!("Update available: {}", latest_version));
        session.mark_checked(manifest);
        self.notify(Operation::Check, None, Some(latest_version.clone()));
        Ok(CheckOutcome::UpdateAvailable { latest_version })
    }

    /// Download the offered artifact, stage it, and apply it
    pub async fn download(&self, session: &mut UpdateSession) -> Result<ApplyReport> {
        let source_url = match (session.phase(), session.manifest()) {
            (Phase::Checked, Some(RemoteManifest { source_url: Some(url), .. })) => url.clone(),
            (actual, _) => {
                return Err(UpdateError::InvalidPhase {
                    operation: "download",
                    expected: Phase::Checked,
                    actual,
                });
            }
        };

        session.start_downloading();
        self.log.info(format!("Downloading {}", source_url));

        let bytes = match self.transport.get(&source_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err(self.fail(
                    session,
                    Operation::Download,
                    ErrorKind::UpdateFileNotFound,
                    format!("Could not find the update file: {}", e),
                ));
            }
        };

        let staged = match write_staged(&self.layout, &bytes) {
            Ok(staged) => staged,
            Err(e) => {
                return Err(self.fail(
                    session,
                    Operation::Download,
                    ErrorKind::FailedToDownloadUpdate,
                    format!("Failed to download the update to a local file: {}", e),
                ));
            }
        };

        self.log.info(format!(
            "Update downloaded: {} ({} bytes, sha256 {})",
            staged.display(),
            bytes.len(),
            hex::encode(Sha256::digest(&bytes))
        ));
        session.mark_downloaded(staged);

        self.run_apply(session, Operation::Download)
    }

    /// Install the staged artifact
    ///
    /// `download` already does this; calling it standalone is only valid on
    /// a session sitting in `Downloaded`.
    pub fn apply(&self, session: &mut UpdateSession) -> Result<ApplyReport> {
        if session.phase() != Phase::Downloaded {
            return Err(UpdateError::InvalidPhase {
                operation: "apply",
                expected: Phase::Downloaded,
                actual: session.phase(),
            });
        }
        self.run_apply(session, Operation::Apply)
    }

    fn run_apply(&self, session: &mut UpdateSession, operation: Operation) -> Result<ApplyReport> {
        let Some(staged) = session.staged_file().map(Path::to_path_buf) else {
            return Err(UpdateError::InvalidPhase {
                operation: "apply",
                expected: Phase::Downloaded,
                actual: session.phase(),
            });
        };

        session.start_applying();
        match self.engine.apply(&staged, &self.layout.path) {
            Ok(report) => {
                self.log_removal(report.removal.as_ref());
                self.log.info(format!(
                    "Installed {} at {}; restart required",
                    display_version(session.latest_version().unwrap_or_default()),
                    report.installed_path.display()
                ));
                self.log.info("End of update.");
                session.mark_applied();
                self.notify(operation, None, session.latest_version().map(str::to_string));
                Ok(report)
            }
            Err(e) => {
                self.log_removal(e.removal.as_ref());
                Err(self.fail(
                    session,
                    operation,
                    ErrorKind::FailedToApplyUpdate,
                    format!("Rename error: {}", e),
                ))
            }
        }
    }

    // Removal failures stay in the log and the report; the sink only sees
    // the rename outcome.
    fn log_removal(&self, removal: Option<&RemovalOutcome>) {
        match removal {
            Some(RemovalOutcome::Failed { reason }) => {
                self.log.warn(format!("Delete error: {}", reason));
            }
            Some(RemovalOutcome::Removed) => self.log.info("Installed artifact deleted"),
            Some(RemovalOutcome::NotPresent) | None => {}
        }
    }

    fn up_to_date(&self, session: &mut UpdateSession, latest_version: String) -> CheckOutcome {
        session.mark_up_to_date();
        self.notify(
            Operation::Check,
            Some(ErrorKind::NoUpdateAvailable),
            Some(latest_version.clone()),
        );
        CheckOutcome::UpToDate { latest_version }
    }

    fn fail(
        &self,
        session: &mut UpdateSession,
        operation: Operation,
        kind: ErrorKind,
        message: String,
    ) -> UpdateError {
        self.log.error(&message);
        session.mark_failed(kind);
        self.notify(operation, Some(kind), session.latest_version().map(str::to_string));
        UpdateError::failed(kind, message)
    }

    fn notify(&self, operation: Operation, error: Option<ErrorKind>, latest_version: Option<String>) {
        if let Some(sink) = &self.sink {
            sink.notify(&Completion {
                operation,
                error,
                latest_version,
            });
        }
    }
}

/// Write the artifact under a temporary name, then rename it into place
fn write_staged(layout: &InstallLayout, bytes: &[u8]) -> io::Result<PathBuf> {
    let partial = layout.partial_path();
    let staged = layout.staged_path();

    let result = fs::write(&partial, bytes).and_then(|_| fs::rename(&partial, &staged));
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result.map(|_| staged)
}

fn display_version(version: &str) -> &str {
    if version.is_empty() {
        "<unspecified>"
    } else {
        version
    }
}
