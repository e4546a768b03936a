use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sysdash::app::{App, Settings};
use sysdash::cli::{Cli, BUILD_TIMESTAMP};
use sysdash::core::DashError;
use sysdash::utils::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<DashError>() {
            Some(DashError::CanceledByUser) => ExitCode::SUCCESS,
            _ => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config, cli.log_file.as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), built = BUILD_TIMESTAMP, "sysdash starting");

    let interval = config
        .refresh_interval(cli.refresh_override())
        .map_err(|e| DashError::Config(e.to_string()))?;
    let settings = Settings {
        interval,
        action_timeout: config.action_timeout(),
    };

    App::new(cli.selector(), settings).run().await?;
    Ok(())
}

/// The terminal belongs to the UI, so logs only go to a file when one is configured.
fn init_logging(config: &AppConfig, cli_log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .context("Invalid log level")?;

    match config.log_file(cli_log_file) {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
    Ok(())
}
