//! Terminal rendering for updater commands
//!
//! `render_*` functions build the text so it can be tested; `print_*`
//! functions write it out.

use crate::engine::updater::{ApplyReport, CheckOutcome, ErrorKind, RemovalOutcome, UpdateError};
use colored::Colorize;

/// Width of the label column in status output
const LABEL_WIDTH: usize = 14;

pub struct UpdateFormatter;

impl UpdateFormatter {
    pub fn print_error(error: &dyn std::error::Error) {
        eprintln!("{} {}", "error:".red().bold(), error);
    }

    pub fn print_note(message: &str) {
        println!("{} {}", "›".bright_black(), message);
    }

    /// Title line for the `status` listing
    pub fn print_title(title: &str) {
        println!("{}", title.bright_cyan().bold());
    }

    /// One aligned `label  value` row; `None` renders dimmed as `placeholder`
    pub fn render_field(label: &str, value: Option<&str>, placeholder: &str) -> String {
        let value = match value {
            Some(v) => v.to_string(),
            None => placeholder.bright_black().to_string(),
        };
        format!("  {:<width$} {}", label, value, width = LABEL_WIDTH)
    }

    pub fn print_field(label: &str, value: Option<&str>, placeholder: &str) {
        println!("{}", Self::render_field(label, value, placeholder));
    }

    pub fn render_updatable(updatable: bool) -> String {
        if updatable {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        }
    }

    pub fn render_check_outcome(local_version: &str, outcome: &CheckOutcome) -> String {
        match outcome {
            CheckOutcome::UpdateAvailable { latest_version } => format!(
                "{} {} → {}",
                "update available:".green().bold(),
                local_version,
                latest_version.bold()
            ),
            CheckOutcome::UpToDate { latest_version } => format!(
                "{} installed {}, server reports {}",
                "up to date:".blue().bold(),
                local_version,
                latest_version
            ),
        }
    }

    pub fn print_check_outcome(local_version: &str, outcome: &CheckOutcome) {
        println!("{}", Self::render_check_outcome(local_version, outcome));
    }

    /// Lines describing a finished install, removal warning first
    pub fn render_install(latest_version: &str, report: &ApplyReport) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(RemovalOutcome::Failed { reason }) = &report.removal {
            lines.push(format!(
                "{} old artifact was not removed ({})",
                "warning:".yellow().bold(),
                reason
            ));
        }
        lines.push(format!(
            "{} {} at {}",
            "installed".green().bold(),
            latest_version,
            report.installed_path.display()
        ));
        lines.push("restart the application to run the new version".to_string());
        lines
    }

    pub fn print_install(latest_version: &str, report: &ApplyReport) {
        for line in Self::render_install(latest_version, report) {
            println!("{}", line);
        }
    }

    /// What the user can do about a failed operation
    pub fn hint(kind: ErrorKind) -> Option<&'static str> {
        match kind {
            ErrorKind::VersionNotSpecified => {
                Some("add a \"version\" field to the application descriptor")
            }
            ErrorKind::UpdateSourceUnreachable => {
                Some("check the install path; run `status` for the reason")
            }
            ErrorKind::CannotConnectToApi | ErrorKind::UpdateFileNotFound => {
                Some("the server may be down; try again later")
            }
            ErrorKind::ApiResponseNotValid => Some("the manifest endpoint returned an unexpected body"),
            ErrorKind::FailedToDownloadUpdate | ErrorKind::FailedToApplyUpdate => {
                Some("check write permissions on the install directory")
            }
            ErrorKind::NoUpdateAvailable => None,
        }
    }

    /// Print an operation error followed by its hint, if any
    pub fn print_update_error(error: &UpdateError) {
        Self::print_error(error);
        if let Some(hint) = error.kind().and_then(Self::hint) {
            eprintln!("  {} {}", "hint:".bright_black(), hint);
        }
    }
}
