//! Bundle Updater CLI - Main entry point for CLI binary
//!
//! This binary provides the `bundle-updater` tool for checking and applying
//! updates to a packaged application.

use bundle_updater::engine::{
    cli::{formatter::UpdateFormatter, Cli, Commands, OutputFormat},
    config::UpdaterConfig,
    updater::{CheckOutcome, Completion, InstallLayout, UpdateError, Updater},
};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run_cli(cli) {
        match e.downcast_ref::<UpdateError>() {
            Some(update_error) => UpdateFormatter::print_update_error(update_error),
            None => UpdateFormatter::print_error(e.as_ref()),
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_cli(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli.get_config_path()?;
    let json_output = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Init {
            api,
            install,
            descriptor,
            expected_artifact_name,
            force,
        } => {
            let mut layout = InstallLayout::new(install);
            if let Some(descriptor) = descriptor {
                layout = layout.with_descriptor(descriptor);
            }
            if let Some(name) = expected_artifact_name {
                layout = layout.with_expected_artifact_name(name);
            }
            cmd_init(&config_path, api, layout, force, json_output)?;
        }
        Commands::Status => {
            cmd_status(&config_path, json_output)?;
        }
        Commands::Check => {
            cmd_check(&config_path, json_output)?;
        }
        Commands::Update { yes } => {
            cmd_update(&config_path, yes, json_output)?;
        }
    }

    Ok(())
}

fn cmd_init(
    config_path: &Path,
    api: String,
    layout: InstallLayout,
    force: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !force {
        return Err(format!(
            "Config already exists: {} (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    let config = UpdaterConfig::new(api, layout);
    config.validate()?;
    config.save(config_path)?;

    if json {
        println!("{}", serde_json::json!({
            "success": true,
            "config": config_path.display().to_string(),
        }));
    } else {
        UpdateFormatter::print_note(&format!("wrote {}", config_path.display()));
    }

    Ok(())
}

fn cmd_status(config_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = UpdaterConfig::load(config_path)?;
    let layout = &config.install;
    let local_version = layout.read_local_version();
    let updatable = layout.check_updatable();

    if json {
        println!("{}", serde_json::json!({
            "api": config.api,
            "install_path": layout.path.display().to_string(),
            "descriptor": layout.descriptor_path().display().to_string(),
            "staged_path": layout.staged_path().display().to_string(),
            "log_file": config.log_path().map(|p| p.display().to_string()),
            "local_version": local_version,
            "expected_artifact_name": layout.expected_artifact_name,
            "updatable": updatable.is_ok(),
            "reason": updatable.as_ref().err().map(|e| e.to_string()),
            "version_policy": config.policy.version,
            "apply_strategy": config.policy.apply_strategy,
        }));
    } else {
        let log_path = config.log_path().map(|p| p.display().to_string());
        UpdateFormatter::print_title("Updater status");
        UpdateFormatter::print_field("API", Some(config.api.as_str()), "");
        UpdateFormatter::print_field("Install", Some(layout.path.display().to_string().as_str()), "");
        UpdateFormatter::print_field(
            "Artifact name",
            layout.expected_artifact_name.as_deref(),
            "(any)",
        );
        UpdateFormatter::print_field(
            "Descriptor",
            Some(layout.descriptor_path().display().to_string().as_str()),
            "",
        );
        UpdateFormatter::print_field("Staging", Some(layout.staged_path().display().to_string().as_str()), "");
        UpdateFormatter::print_field("Log file", log_path.as_deref(), "(disabled)");
        UpdateFormatter::print_field("Local version", local_version.as_deref(), "(not specified)");
        let updatable_text = match &updatable {
            Ok(()) => UpdateFormatter::render_updatable(true),
            Err(reason) => format!("{} ({})", UpdateFormatter::render_updatable(false), reason),
        };
        UpdateFormatter::print_field("Updatable", Some(updatable_text.as_str()), "");
    }

    Ok(())
}

fn build_updater(
    config_path: &Path,
    json: bool,
) -> Result<Updater<bundle_updater::engine::updater::ReqwestTransport>, Box<dyn std::error::Error>> {
    let config = UpdaterConfig::load(config_path)?;
    let updater = Updater::from_config(&config)?;
    if json {
        Ok(updater.with_sink(|completion: &Completion| {
            if let Ok(line) = serde_json::to_string(completion) {
                println!("{}", line);
            }
        }))
    } else {
        Ok(updater)
    }
}

#[tokio::main]
async fn cmd_check(config_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let updater = build_updater(config_path, json)?;
    let mut session = updater.start_session();

    let outcome = updater.check(&mut session).await?;
    if !json {
        UpdateFormatter::print_check_outcome(session.local_version(), &outcome);
    }

    Ok(())
}

#[tokio::main]
async fn cmd_update(config_path: &Path, yes: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let updater = build_updater(config_path, json)?;
    let mut session = updater.start_session();

    let outcome = updater.check(&mut session).await?;
    if !json {
        UpdateFormatter::print_check_outcome(session.local_version(), &outcome);
    }

    let CheckOutcome::UpdateAvailable { latest_version } = outcome else {
        return Ok(());
    };

    if !yes && !confirm(&format!("Install version {}?", latest_version))? {
        if !json {
            UpdateFormatter::print_note("update skipped");
        }
        return Ok(());
    }

    let report = updater.download(&mut session).await?;
    if !json {
        UpdateFormatter::print_install(&latest_version, &report);
    }

    Ok(())
}

fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
