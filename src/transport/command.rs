//! Auxiliary command connection.

use std::path::{Path, PathBuf};

use super::connection::JsonConnection;
use super::protocol::{ClientCommand, ClientInitMessage, LogLevel, MessageType, PROTOCOL_VERSION};
use super::CommandChannel;
use crate::domain::McodeError;

/// Connection in command mode, used for path resolution, console messages
/// and HTTP endpoint registration.
pub struct DsfCommandConnection {
    conn: JsonConnection,
}

impl DsfCommandConnection {
    pub fn connect(socket_path: &Path) -> Result<Self, McodeError> {
        let conn = JsonConnection::open(socket_path, false)?;
        Self::establish(conn)
    }

    pub fn establish(mut conn: JsonConnection) -> Result<Self, McodeError> {
        conn.handshake(&ClientInitMessage::Command {
            version: PROTOCOL_VERSION,
        })?;
        Ok(Self { conn })
    }

    /// Register an HTTP endpoint and return the socket path the host
    /// forwards its requests to.
    pub fn add_http_endpoint(
        &mut self,
        endpoint_type: &str,
        namespace: &str,
        path: &str,
    ) -> Result<PathBuf, McodeError> {
        let result = self.conn.perform(&ClientCommand::AddHttpEndpoint {
            endpoint_type,
            namespace,
            path,
            is_upload_request: false,
        })?;
        result
            .as_str()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                McodeError::Protocol(format!("AddHttpEndpoint returned no socket path: {}", result))
            })
    }

    pub fn remove_http_endpoint(
        &mut self,
        endpoint_type: &str,
        namespace: &str,
        path: &str,
    ) -> Result<bool, McodeError> {
        let result = self.conn.perform(&ClientCommand::RemoveHttpEndpoint {
            endpoint_type,
            namespace,
            path,
        })?;
        Ok(result.as_bool().unwrap_or(false))
    }

    pub fn close(&mut self) -> Result<(), McodeError> {
        self.conn.close()
    }
}

impl CommandChannel for DsfCommandConnection {
    fn resolve_path(&mut self, path: &str) -> Result<Option<PathBuf>, McodeError> {
        let result = self.conn.perform(&ClientCommand::ResolvePath { path })?;
        Ok(result
            .as_str()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from))
    }

    fn write_message(
        &mut self,
        message_type: MessageType,
        content: &str,
        log_level: LogLevel,
    ) -> Result<(), McodeError> {
        self.conn.perform(&ClientCommand::WriteMessage {
            message_type,
            content,
            output_message: true,
            log_level,
        })?;
        Ok(())
    }
}

impl Drop for DsfCommandConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
