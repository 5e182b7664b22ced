//! Loads the action table from the configured location.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use crate::domain::{ActionTable, LoadReporter};
use crate::transport::{CommandChannel, LogLevel, MessageType};
use crate::PLUGIN_NAME;

/// Source of fresh action tables, consulted at start and on every
/// reconfiguration.
pub trait ActionLoader {
    fn load_actions(&mut self) -> ActionTable;
}

/// Action file reached through the host's command channel.
pub struct ActionStore<C: CommandChannel> {
    channel: C,
    location: String,
}

fn virtual_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+:/").expect("valid virtual path pattern"))
}

impl<C: CommandChannel> ActionStore<C> {
    /// `location` is a virtual host path like `0:/sys/ExecOnMcode.json` or
    /// a local file path.
    pub fn new(channel: C, location: String) -> Self {
        Self { channel, location }
    }

    /// Local path of the action file, if it can be determined.
    pub fn resolve_location(&mut self) -> Option<PathBuf> {
        if !virtual_path_pattern().is_match(&self.location) {
            return Some(PathBuf::from(&self.location));
        }

        match self.channel.resolve_path(&self.location) {
            Ok(Some(path)) => Some(path),
            Ok(None) => {
                self.report(&format!("Could not resolve {}", self.location));
                None
            }
            Err(e) => {
                self.report(&format!("Could not resolve {}: {}", self.location, e));
                None
            }
        }
    }

    fn report(&mut self, message: &str) {
        HostReporter {
            channel: &mut self.channel,
        }
        .report(message);
    }
}

impl<C: CommandChannel> ActionLoader for ActionStore<C> {
    fn load_actions(&mut self) -> ActionTable {
        let Some(path) = self.resolve_location() else {
            return ActionTable::default();
        };

        let mut reporter = HostReporter {
            channel: &mut self.channel,
        };
        let table = ActionTable::load(&path, &mut reporter);
        if table.is_empty() {
            info!("No actions configured in {}", path.display());
        } else {
            info!("Loaded {} action(s) from {}", table.len(), path.display());
        }
        table
    }
}

/// Logs load problems and mirrors them on the host console.
struct HostReporter<'a, C: CommandChannel> {
    channel: &'a mut C,
}

impl<C: CommandChannel> LoadReporter for HostReporter<'_, C> {
    fn report(&mut self, message: &str) {
        warn!("{}", message);
        let content = format!("{}: {}", PLUGIN_NAME, message);
        if let Err(e) = self
            .channel
            .write_message(MessageType::Error, &content, LogLevel::Warn)
        {
            warn!("Failed to forward message to host: {}", e);
        }
    }
}
