//! Messages exchanged with the host over the control socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Protocol version announced in init messages.
pub const PROTOCOL_VERSION: u32 = 12;

/// Severity of a resolved code or console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Success,
    Warning,
    Error,
}

/// Log level attached to console messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Off,
}

/// First message sent by the host on every new connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInitMessage {
    pub version: u32,
    pub id: u64,
}

/// Selects the connection mode right after the greeting.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode")]
pub enum ClientInitMessage {
    #[serde(rename_all = "camelCase")]
    Intercept {
        version: u32,
        interception_mode: &'static str,
        filters: Vec<String>,
        priority_codes: bool,
    },
    #[serde(rename_all = "camelCase")]
    Command { version: u32 },
}

/// Generic answer to an init message or a request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Commands sent by this client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command")]
pub enum ClientCommand<'a> {
    Ignore,
    Cancel,
    Resolve {
        #[serde(rename = "type")]
        message_type: MessageType,
        content: Option<&'a str>,
    },
    Flush {
        channel: &'a str,
    },
    ResolvePath {
        path: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    WriteMessage {
        #[serde(rename = "type")]
        message_type: MessageType,
        content: &'a str,
        output_message: bool,
        log_level: LogLevel,
    },
    #[serde(rename_all = "camelCase")]
    AddHttpEndpoint {
        endpoint_type: &'a str,
        namespace: &'a str,
        path: &'a str,
        is_upload_request: bool,
    },
    #[serde(rename_all = "camelCase")]
    RemoveHttpEndpoint {
        endpoint_type: &'a str,
        namespace: &'a str,
        path: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    SendHttpResponse {
        status_code: u16,
        response: &'a str,
        response_type: HttpResponseType,
    },
}

impl ClientCommand<'_> {
    /// Commands the host answers with a [`Response`].
    pub fn expects_response(&self) -> bool {
        !matches!(
            self,
            ClientCommand::Ignore
                | ClientCommand::Cancel
                | ClientCommand::Resolve { .. }
                | ClientCommand::SendHttpResponse { .. }
        )
    }
}

/// How the host should interpret an HTTP endpoint response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpResponseType {
    StatusCode,
    #[serde(rename = "JSON")]
    Json,
}

/// Request forwarded by the host to an HTTP endpoint socket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceivedHttpRequest {
    pub session_id: i64,
    pub queries: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub content_type: Option<String>,
    pub body: String,
}
