//! HTTP side-channel endpoint.
//!
//! The host exposes `/machine/<namespace>/<path>` and forwards each request
//! to a Unix socket owned by this process. Requests are answered on a
//! dedicated thread; the endpoint is unregistered when the value is dropped.

use std::fs;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::command::DsfCommandConnection;
use super::connection::JsonConnection;
use super::protocol::{ClientCommand, HttpResponseType, ReceivedHttpRequest};
use crate::domain::McodeError;

/// Answer produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    pub response_type: HttpResponseType,
}

impl HttpResponse {
    pub fn json(body: String) -> Self {
        Self {
            status_code: 200,
            body,
            response_type: HttpResponseType::Json,
        }
    }

    pub fn status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            body: message.into(),
            response_type: HttpResponseType::StatusCode,
        }
    }
}

pub type Responder = Box<dyn Fn(&ReceivedHttpRequest) -> HttpResponse + Send + 'static>;

/// A registered endpoint and the thread serving it.
pub struct HttpEndpoint {
    commands: DsfCommandConnection,
    endpoint_type: &'static str,
    namespace: String,
    path: String,
    socket_file: PathBuf,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl HttpEndpoint {
    /// Register `GET /machine/<namespace>/<path>` and start serving it.
    pub fn open(
        socket_path: &Path,
        namespace: &str,
        path: &str,
        responder: Responder,
    ) -> Result<Self, McodeError> {
        let mut commands = DsfCommandConnection::connect(socket_path)?;
        let endpoint_type = "GET";
        let socket_file = commands.add_http_endpoint(endpoint_type, namespace, path)?;

        let listener = match bind(&socket_file) {
            Ok(listener) => listener,
            Err(e) => {
                let _ = commands.remove_http_endpoint(endpoint_type, namespace, path);
                return Err(e.into());
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || serve(listener, &stop, responder))
        };

        info!(
            "Registered HTTP endpoint {} /machine/{}/{}",
            endpoint_type, namespace, path
        );

        Ok(Self {
            commands,
            endpoint_type,
            namespace: namespace.to_string(),
            path: path.to_string(),
            socket_file,
            stop,
            worker: Some(worker),
        })
    }
}

impl Drop for HttpEndpoint {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Wake the accept loop so it notices the stop flag
        let _ = UnixStream::connect(&self.socket_file);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }

        if let Err(e) =
            self.commands
                .remove_http_endpoint(self.endpoint_type, &self.namespace, &self.path)
        {
            warn!("Failed to unregister HTTP endpoint: {}", e);
        }
        let _ = fs::remove_file(&self.socket_file);
        debug!("HTTP endpoint closed");
    }
}

fn bind(socket_file: &Path) -> std::io::Result<UnixListener> {
    if let Some(parent) = socket_file.parent() {
        fs::create_dir_all(parent)?;
    }
    // Left over from a previous run
    if socket_file.exists() {
        fs::remove_file(socket_file)?;
    }
    UnixListener::bind(socket_file)
}

fn serve(listener: UnixListener, stop: &AtomicBool, responder: Responder) {
    for stream in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        match stream {
            Ok(stream) => {
                if let Err(e) = answer(stream, &responder) {
                    warn!("HTTP endpoint request failed: {}", e);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("HTTP endpoint accept failed: {}", e);
                break;
            }
        }
    }
}

fn answer(stream: UnixStream, responder: &Responder) -> Result<(), McodeError> {
    let mut conn = JsonConnection::from_stream(stream, false)?;
    let request: ReceivedHttpRequest = conn.receive()?;
    debug!("HTTP endpoint request (session {})", request.session_id);

    let response = responder(&request);
    conn.perform(&ClientCommand::SendHttpResponse {
        status_code: response.status_code,
        response: &response.body,
        response_type: response.response_type,
    })?;
    conn.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_serve_answers_requests() {
        let dir = TempDir::new().unwrap();
        let socket_file = dir.path().join("endpoint.sock");
        let listener = bind(&socket_file).unwrap();
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                serve(
                    listener,
                    &stop,
                    Box::new(|_: &ReceivedHttpRequest| HttpResponse::json(r#"[{"cmd_code":"M1201"}]"#.to_string())),
                )
            })
        };

        let mut client = UnixStream::connect(&socket_file).unwrap();
        client
            .write_all(br#"{"sessionId":4,"queries":{},"headers":{},"contentType":null,"body":""}"#)
            .unwrap();
        let mut reader = serde_json::Deserializer::from_reader(client).into_iter::<Value>();
        let response = reader.next().unwrap().unwrap();
        assert_eq!(
            response,
            json!({
                "command": "SendHttpResponse",
                "statusCode": 200,
                "response": r#"[{"cmd_code":"M1201"}]"#,
                "responseType": "JSON"
            })
        );

        stop.store(true, Ordering::SeqCst);
        let _ = UnixStream::connect(&socket_file);
        worker.join().unwrap();
    }

    #[test]
    fn test_bind_replaces_stale_socket() {
        let dir = TempDir::new().unwrap();
        let socket_file = dir.path().join("nested").join("endpoint.sock");
        drop(bind(&socket_file).unwrap());
        assert!(socket_file.exists());
        assert!(bind(&socket_file).is_ok());
    }
}
