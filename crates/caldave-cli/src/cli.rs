//! Command-line interface definition.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// caldave - real-time calendar availability over WebSocket
#[derive(Debug, Parser)]
#[command(name = "caldave")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALDAVE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the WebSocket server in the foreground (default)
    Serve(ServeArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the free slots of a date using the configured events file
    Availability(AvailabilityArgs),
}

/// Options of the `serve` command. They override the configuration file.
#[derive(Debug, Default, Clone, Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Port to listen on (also read from PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// JSON events file used as the calendar source
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Seconds between periodic calendar refreshes
    #[arg(long)]
    pub refresh_interval: Option<u64>,
}

/// Options of the `availability` command.
#[derive(Debug, Clone, Args)]
pub struct AvailabilityArgs {
    /// Date to inspect (YYYY-MM-DD)
    pub date: String,

    /// JSON events file, instead of the configured one
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Print the AVAILABILITY_RESPONSE message instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration
    Dump,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::parse_from(["caldave"]);
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn serve_overrides() {
        let cli = Cli::parse_from(["caldave", "serve", "--port", "9001", "--bind", "127.0.0.1"]);
        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(9001));
        assert_eq!(args.bind, Some("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn availability_takes_a_date() {
        let cli = Cli::parse_from(["caldave", "availability", "2024-10-14", "--json", "-v"]);
        let Some(Command::Availability(args)) = cli.command else {
            panic!("expected availability");
        };
        assert_eq!(args.date, "2024-10-14");
        assert!(args.json);
        assert!(cli.debug);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
