//! Updater CLI Module
//! Command-line interface for checking and applying updates

pub mod formatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bundle-updater")]
#[command(author = "Bundle Updater Team")]
#[command(version)]
#[command(about = "Self-update agent for packaged desktop applications", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (json for scripting)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a new config file
    Init {
        /// Manifest endpoint URL
        #[arg(short, long)]
        api: String,

        /// Installed artifact replaced by updates
        #[arg(short, long)]
        install: PathBuf,

        /// Descriptor holding the local version
        #[arg(short, long)]
        descriptor: Option<PathBuf>,

        /// Refuse to update unless the installed artifact has this file name
        #[arg(long)]
        expected_artifact_name: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show configuration and installation status
    Status,

    /// Check for an available update
    Check,

    /// Check, download and apply an update (requires restart)
    Update {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    pub fn get_config_path(&self) -> Result<PathBuf, crate::engine::config::ConfigError> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => crate::engine::config::UpdaterConfig::default_path(),
        }
    }
}
