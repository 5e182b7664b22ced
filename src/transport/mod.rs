//! Host communication.
//!
//! The interception loop only talks to the traits defined here. The
//! concrete implementations speak the firmware host's JSON protocol over
//! its Unix control socket:
//! - [`DsfInterceptConnector`]: interception sessions
//! - [`DsfCommandConnection`]: auxiliary command channel
//! - [`HttpEndpoint`]: HTTP side channel

mod command;
mod connection;
pub mod endpoint;
mod intercept;
pub mod protocol;

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::domain::{Code, McodeError};

pub use command::DsfCommandConnection;
pub use endpoint::HttpEndpoint;
pub use intercept::DsfInterceptConnector;
pub use protocol::{LogLevel, MessageType};

/// A live interception session.
///
/// After [`InterceptSession::receive_code`] returns, exactly one of
/// `resolve_code`, `cancel_code` or `ignore_code` must be sent before the
/// next receive. `flush` may be used in between.
pub trait InterceptSession {
    /// Block until the host routes the next code to us.
    fn receive_code(&mut self) -> Result<Code, McodeError>;

    /// Finish the current code with a result.
    fn resolve_code(
        &mut self,
        message_type: MessageType,
        content: Option<&str>,
    ) -> Result<(), McodeError>;

    /// Reject the current code.
    fn cancel_code(&mut self) -> Result<(), McodeError>;

    /// Let the current code continue unmodified.
    fn ignore_code(&mut self) -> Result<(), McodeError>;

    /// Wait until all codes of `channel` ahead of the current one were
    /// executed. Returns false if the host could not synchronise.
    fn flush(&mut self, channel: &str) -> Result<bool, McodeError>;

    fn close(&mut self) -> Result<(), McodeError>;
}

/// Opens interception sessions for a given filter set.
pub trait SessionConnector {
    type Session: InterceptSession;

    fn connect(&mut self, filters: &BTreeSet<String>) -> Result<Self::Session, McodeError>;
}

/// Auxiliary command channel to the host.
pub trait CommandChannel {
    /// Map a virtual path such as `0:/sys/file.json` to a local path.
    fn resolve_path(&mut self, path: &str) -> Result<Option<PathBuf>, McodeError>;

    /// Show a message on the host console.
    fn write_message(
        &mut self,
        message_type: MessageType,
        content: &str,
        log_level: LogLevel,
    ) -> Result<(), McodeError>;
}
