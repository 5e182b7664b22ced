//! JSON message stream over a Unix socket.

use std::io::{BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::de::IoRead;
use serde_json::{StreamDeserializer, Value};
use tracing::debug;

use super::protocol::{ClientCommand, ClientInitMessage, Response, ServerInitMessage};
use crate::domain::McodeError;

/// One connection to the host.
///
/// The host does not delimit messages, so incoming data is read as a
/// stream of concatenated JSON values.
pub struct JsonConnection {
    writer: UnixStream,
    reader: StreamDeserializer<'static, IoRead<BufReader<UnixStream>>, Value>,
    debug: bool,
}

impl JsonConnection {
    pub fn open(socket_path: &Path, debug: bool) -> Result<Self, McodeError> {
        let stream = UnixStream::connect(socket_path)?;
        Self::from_stream(stream, debug)
    }

    pub fn from_stream(stream: UnixStream, debug: bool) -> Result<Self, McodeError> {
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            writer: stream,
            reader: serde_json::Deserializer::from_reader(reader).into_iter(),
            debug,
        })
    }

    /// Read the greeting, select the connection mode and return the
    /// connection id assigned by the host.
    pub fn handshake(&mut self, init: &ClientInitMessage) -> Result<u64, McodeError> {
        let greeting: ServerInitMessage = self.receive()?;
        debug!(
            "Connected to host (protocol version {}, connection #{})",
            greeting.version, greeting.id
        );

        self.send(init)?;
        let response: Response = self.receive()?;
        check(response)?;

        Ok(greeting.id)
    }

    pub fn receive<T: DeserializeOwned>(&mut self) -> Result<T, McodeError> {
        let value = match self.reader.next() {
            None => return Err(McodeError::ConnectionClosed),
            Some(Err(e)) if e.is_eof() => return Err(McodeError::ConnectionClosed),
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(value)) => value,
        };
        if self.debug {
            debug!("<- {}", value);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn send<T: Serialize>(&mut self, message: &T) -> Result<(), McodeError> {
        let json = serde_json::to_string(message)?;
        if self.debug {
            debug!("-> {}", json);
        }
        self.writer.write_all(json.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Send a command and, if the host answers it, return the result.
    pub fn perform(&mut self, command: &ClientCommand<'_>) -> Result<Value, McodeError> {
        self.send(command)?;
        if !command.expects_response() {
            return Ok(Value::Null);
        }
        let response: Response = self.receive()?;
        check(response)
    }

    /// Second handle on the socket, used to shut it down from elsewhere.
    pub fn try_clone_stream(&self) -> std::io::Result<UnixStream> {
        self.writer.try_clone()
    }

    pub fn close(&mut self) -> Result<(), McodeError> {
        match self.writer.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Already gone on the other side
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn check(response: Response) -> Result<Value, McodeError> {
    if response.success {
        Ok(response.result)
    } else {
        Err(McodeError::Rejected {
            kind: response
                .error_type
                .unwrap_or_else(|| "UnknownError".to_string()),
            message: response.error_message.unwrap_or_default(),
        })
    }
}
