//! caldave entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use caldave_cli::cli::{Cli, Command, ConfigAction, ServeArgs};
use caldave_cli::commands;
use caldave_cli::config::{FileConfig, PORT_ENV};
use caldave_cli::error::CliResult;
use caldave_core::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "caldave failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = FileConfig::load(cli.config.as_deref())?;
    config.apply_port_env(std::env::var(PORT_ENV).ok().as_deref())?;

    init_logging(&config.logging_config(cli.debug, cli.log_format.as_deref())?)?;

    match cli.command.unwrap_or_else(|| Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => {
            config.apply_serve_args(&args);
            commands::serve::run(&config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, cli.config.as_deref()),
            ConfigAction::Path => commands::config::path(cli.config.as_deref()),
        },
        Command::Availability(args) => commands::availability::run(&args, &config).await,
    }
}
