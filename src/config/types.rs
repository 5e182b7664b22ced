//! Configuration data types.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::validation;

/// Where the interception session sits relative to the firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InterceptionMode {
    /// Before the code is executed
    #[default]
    Pre,
    /// After the code was processed internally but before it is sent out
    Post,
    /// After the code has been executed
    Executed,
}

impl InterceptionMode {
    /// Name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            InterceptionMode::Pre => "Pre",
            InterceptionMode::Post => "Post",
            InterceptionMode::Executed => "Executed",
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host control socket
    pub socket_path: PathBuf,

    /// Action file: a virtual host path (`0:/sys/...`) or a local path
    pub actions_path: String,

    /// Interception mode requested from the host
    pub interception_mode: InterceptionMode,

    /// Log raw protocol traffic of the interception session at debug level
    pub protocol_debug: bool,

    /// Register the HTTP side-channel endpoint
    pub http_endpoint: bool,

    /// Treat a non-zero exit status as a failed action
    pub strict_exit_status: bool,

    /// Enable debug logging to file
    pub debug: bool,

    /// Path to log directory
    pub log_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            actions_path: default_actions_path(),
            interception_mode: InterceptionMode::Pre,
            protocol_debug: true,
            http_endpoint: true,
            strict_exit_status: false,
            debug: false,
            log_path: default_log_path(),
        }
    }
}

impl Config {
    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

/// Default host control socket.
pub const DEFAULT_SOCKET_PATH: &str = "/run/dsf/dcs.sock";

/// Default action file on the host's virtual file system.
pub fn default_actions_path() -> String {
    format!("0:/sys/{}.json", crate::PLUGIN_NAME)
}

/// Get default log path (relative to config directory).
/// This returns a placeholder; the actual path is set by ConfigService based on config file location.
pub fn default_log_path() -> PathBuf {
    default_log_path_for_config_dir(None)
}

/// Get log path based on config directory.
pub fn default_log_path_for_config_dir(config_dir: Option<&Path>) -> PathBuf {
    config_dir
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("exec-on-mcode")
        })
        .join("logs")
}
