//! exec-on-mcode: run shell commands on intercepted M-codes
//!
//! Connects to the firmware host's control socket, intercepts the M-codes
//! listed in a JSON action file and resolves each one with the result of
//! its shell command.

mod cli;
mod config;
mod domain;
mod service;
mod shutdown;
mod transport;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::Path;

use cli::{Cli, Commands};
use config::{Config, ConfigService};
use domain::ActionTable;

/// Name the plugin uses on the host console and for its HTTP namespace.
pub const PLUGIN_NAME: &str = "ExecOnMcode";

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { socket, mode } => {
            let mut config = load_config(cli.config.as_deref(), cli.debug)?;
            if let Some(socket) = socket {
                config.socket_path = socket;
            }
            if let Some(mode) = mode {
                config.interception_mode = mode;
            }
            config::validate(&config)?;
            service::run_daemon(&config)?;
        }
        Commands::Init { path } => {
            let config_path = if let Some(p) = path {
                ConfigService::generate_at(&p)?;
                p
            } else {
                ConfigService::generate_default()?;
                ConfigService::default_path()
            };
            if !cli.quiet {
                eprintln!("Configuration file created at: {}", config_path.display());
            }
        }
        Commands::Check { actions } => {
            let config = load_config(cli.config.as_deref(), cli.debug)?;
            config::validate(&config)?;
            if !cli.quiet {
                eprintln!("Configuration is valid.");
            }
            if let Some(path) = actions {
                check_actions(&path, cli.quiet)?;
            }
        }
        Commands::Version => {
            println!("exec-on-mcode {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, debug: bool) -> Result<Config> {
    let config = ConfigService::load(path)?;
    domain::logger::init(&config, debug || config.debug)?;
    Ok(config)
}

/// Validate a local action file without touching it.
fn check_actions(path: &Path, quiet: bool) -> Result<()> {
    if !path.exists() {
        bail!("Action file not found: {}", path.display());
    }

    let mut messages: Vec<String> = Vec::new();
    let table = ActionTable::load(path, &mut messages);
    for message in &messages {
        eprintln!("warning: {}", message);
    }
    if !messages.is_empty() {
        bail!("{} problem(s) found in {}", messages.len(), path.display());
    }

    if !quiet {
        for action in table.iter() {
            let state = if action.enabled { "" } else { " (disabled)" };
            eprintln!("{} {} -> `{}`{}", action.code, action.name, action.command, state);
        }
        let filters: Vec<String> = table.filter_codes().into_iter().collect();
        eprintln!("Filters: {}", filters.join(", "));
        eprintln!("Action file is valid ({} action(s)).", table.len());
    }
    Ok(())
}
