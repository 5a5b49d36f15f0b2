//! Configuration commands.

use std::path::Path;

use crate::config::FileConfig;
use crate::error::CliResult;

/// Renders the effective configuration as TOML.
pub fn render(config: &FileConfig) -> CliResult<String> {
    Ok(toml::to_string_pretty(config)?)
}

/// Dump the effective configuration to stdout.
pub fn dump(config: &FileConfig, path: Option<&Path>) -> CliResult<()> {
    let default_path = FileConfig::default_path();
    let path = path.unwrap_or(default_path.as_path());
    println!("# config.toml ({})", path.display());
    println!("{}", render(config)?);
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: Option<&Path>) -> CliResult<()> {
    match path {
        Some(path) => println!("config: {}", path.display()),
        None => println!("config: {}", FileConfig::default_path().display()),
    }
    Ok(())
}
