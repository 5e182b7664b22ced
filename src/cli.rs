//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::InterceptionMode;

/// Run shell commands when M-codes arrive at the firmware host
#[derive(Parser)]
#[command(
    name = "exec-on-mcode",
    version,
    about = "Run shell commands when M-codes arrive at the firmware host",
    long_about = "Intercepts configured M-codes on the firmware host's control socket, \
                  runs the matching shell command and resolves the code with its result."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the host and intercept codes (alias: daemon)
    #[command(alias = "daemon")]
    Run {
        /// Host control socket, overrides the configuration
        #[arg(long, short = 's')]
        socket: Option<PathBuf>,

        /// Interception mode, overrides the configuration
        #[arg(long, short = 'm')]
        mode: Option<InterceptionMode>,
    },
    /// Generate default configuration file
    Init {
        /// Path where to create the configuration file
        #[arg(long, short = 'p')]
        path: Option<PathBuf>,
    },
    /// Validate configuration file, and optionally a local action file
    Check {
        /// Action file to validate
        #[arg(long, short = 'a')]
        actions: Option<PathBuf>,
    },
    /// Display version information
    Version,
}
