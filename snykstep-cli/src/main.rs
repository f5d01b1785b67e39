//! snykstep -- Snyk dependency scanning as a CI build step.
//!
//! Configuration is layered: defaults, `ESTAFETTE_*` environment variables,
//! then command line flags. Errors map to exit codes via
//! [`CliError::exit_code`](error::CliError::exit_code).

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), err);
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = commands::load_config(&cli)?;
    logging::init_tracing(&config.log_format, &config.log_level)
        .map_err(|e| CliError::Command(format!("{e:#}")))?;

    tracing::debug!(config = ?config, "effective configuration");
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Run(args) => {
            let cancel = CancellationToken::new();
            spawn_shutdown_listener(cancel.clone());
            commands::run::execute(args, &config, cancel, &writer).await
        }
        Commands::Detect(args) => commands::detect::execute(args, &config, &writer),
        Commands::Projects(args) => commands::projects::execute(args, &config, &writer).await,
    }
}

/// Cancels `cancel` on SIGTERM or SIGINT, which kills the running child.
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => {
                tracing::warn!(signal, "shutdown signal received, cancelling step");
                cancel.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signals"),
        }
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl+C handler: {}", e))?;
    Ok("ctrl-c")
}
