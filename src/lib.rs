//! Bundle Updater - Self-update agent for packaged desktop applications
//!
//! Checks a manifest endpoint for a newer version, downloads the offered
//! package and swaps it in for the installed one. Restarting the application
//! afterwards is left to the host.

pub mod engine;

pub use engine::config::UpdaterConfig;
pub use engine::updater::{
    CheckOutcome, Completion, ErrorKind, InstallLayout, Phase, UpdateError, UpdateSession, Updater,
};
