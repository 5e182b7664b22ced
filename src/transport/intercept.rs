//! Interception sessions on the host control socket.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::info;

use super::connection::JsonConnection;
use super::protocol::{ClientCommand, ClientInitMessage, MessageType, PROTOCOL_VERSION};
use super::{InterceptSession, SessionConnector};
use crate::config::InterceptionMode;
use crate::domain::{Code, McodeError};
use crate::shutdown::Shutdown;

/// Opens interception connections with a fixed mode.
pub struct DsfInterceptConnector {
    socket_path: PathBuf,
    mode: InterceptionMode,
    debug: bool,
    shutdown: Shutdown,
}

impl DsfInterceptConnector {
    /// Sessions opened by this connector are unblocked when `shutdown`
    /// is triggered.
    pub fn new(
        socket_path: PathBuf,
        mode: InterceptionMode,
        debug: bool,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            socket_path,
            mode,
            debug,
            shutdown,
        }
    }
}

impl SessionConnector for DsfInterceptConnector {
    type Session = DsfInterceptSession;

    fn connect(&mut self, filters: &BTreeSet<String>) -> Result<Self::Session, McodeError> {
        let conn = JsonConnection::open(&self.socket_path, self.debug)?;
        let session = DsfInterceptSession::establish(conn, self.mode, filters)?;
        self.shutdown.watch(session.conn.try_clone_stream()?);
        info!(
            "Intercepting {} codes ({} mode): {}",
            filters.len(),
            self.mode.as_str(),
            filters.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(session)
    }
}

/// An interception connection after a successful handshake.
pub struct DsfInterceptSession {
    conn: JsonConnection,
    closed: bool,
}

impl DsfInterceptSession {
    pub fn establish(
        mut conn: JsonConnection,
        mode: InterceptionMode,
        filters: &BTreeSet<String>,
    ) -> Result<Self, McodeError> {
        conn.handshake(&ClientInitMessage::Intercept {
            version: PROTOCOL_VERSION,
            interception_mode: mode.as_str(),
            filters: filters.iter().cloned().collect(),
            priority_codes: false,
        })?;
        Ok(Self {
            conn,
            closed: false,
        })
    }
}

impl InterceptSession for DsfInterceptSession {
    fn receive_code(&mut self) -> Result<Code, McodeError> {
        self.conn.receive()
    }

    fn resolve_code(
        &mut self,
        message_type: MessageType,
        content: Option<&str>,
    ) -> Result<(), McodeError> {
        self.conn.perform(&ClientCommand::Resolve {
            message_type,
            content,
        })?;
        Ok(())
    }

    fn cancel_code(&mut self) -> Result<(), McodeError> {
        self.conn.perform(&ClientCommand::Cancel)?;
        Ok(())
    }

    fn ignore_code(&mut self) -> Result<(), McodeError> {
        self.conn.perform(&ClientCommand::Ignore)?;
        Ok(())
    }

    fn flush(&mut self, channel: &str) -> Result<bool, McodeError> {
        let result = self.conn.perform(&ClientCommand::Flush { channel })?;
        Ok(result.as_bool().unwrap_or(false))
    }

    fn close(&mut self) -> Result<(), McodeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.conn.close()
    }
}

impl Drop for DsfInterceptSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::thread;

    /// Minimal host: greets, accepts the init message, sends one code,
    /// answers a flush and returns everything the client sent.
    fn fake_host(mut stream: UnixStream, code: Value) -> thread::JoinHandle<Vec<Value>> {
        thread::spawn(move || {
            let mut received = Vec::new();
            let mut reader = serde_json::Deserializer::from_reader(stream.try_clone().unwrap())
                .into_iter::<Value>();

            stream.write_all(br#"{"version":12,"id":7}"#).unwrap();
            received.push(reader.next().unwrap().unwrap());
            stream.write_all(br#"{"success":true}"#).unwrap();

            stream.write_all(code.to_string().as_bytes()).unwrap();
            for message in reader.by_ref() {
                let message = message.unwrap();
                let is_flush = message["command"] == "Flush";
                received.push(message);
                if is_flush {
                    stream.write_all(br#"{"success":true,"result":true}"#).unwrap();
                } else {
                    break;
                }
            }
            received
        })
    }

    #[test]
    fn test_session_round_trip() {
        let (client, server) = UnixStream::pair().unwrap();
        let host = fake_host(
            server,
            json!({"type": "M", "majorNumber": 1201, "channel": "HTTP"}),
        );

        let filters: BTreeSet<String> = ["M1200", "M1201"].iter().map(|s| s.to_string()).collect();
        let conn = JsonConnection::from_stream(client, false).unwrap();
        let mut session =
            DsfInterceptSession::establish(conn, InterceptionMode::Pre, &filters).unwrap();

        let code = session.receive_code().unwrap();
        assert_eq!(code.short_str(), "M1201");
        assert!(session.flush(&code.channel).unwrap());
        session
            .resolve_code(MessageType::Success, Some("hi"))
            .unwrap();

        let received = host.join().unwrap();
        assert_eq!(received[0]["mode"], "Intercept");
        assert_eq!(received[0]["filters"], json!(["M1200", "M1201"]));
        assert_eq!(received[1], json!({"command": "Flush", "channel": "HTTP"}));
        assert_eq!(
            received[2],
            json!({"command": "Resolve", "type": "success", "content": "hi"})
        );

        session.close().unwrap();
        // Closing twice is harmless
        session.close().unwrap();
    }

    #[test]
    fn test_rejected_handshake() {
        let (client, mut server) = UnixStream::pair().unwrap();
        server
            .write_all(br#"{"version":12,"id":1}{"success":false,"errorType":"IncompatibleVersionException","errorMessage":"too old"}"#)
            .unwrap();

        let conn = JsonConnection::from_stream(client, false).unwrap();
        let result = DsfInterceptSession::establish(conn, InterceptionMode::Pre, &BTreeSet::new());
        assert!(matches!(result, Err(McodeError::Rejected { .. })));
    }
}
