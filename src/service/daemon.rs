//! Wires the host connections, the action store and the interception loop
//! together.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::action_store::ActionStore;
use super::intercept_service::InterceptService;
use crate::config::Config;
use crate::domain::ShellRunner;
use crate::shutdown::Shutdown;
use crate::transport::endpoint::HttpResponse;
use crate::transport::protocol::ReceivedHttpRequest;
use crate::transport::{DsfCommandConnection, DsfInterceptConnector, HttpEndpoint};
use crate::PLUGIN_NAME;

const ENDPOINT_PATH: &str = "actions";

/// Run the plugin until the host goes away or a signal arrives.
///
/// Everything acquired here is released on return, on both the success
/// and the error path.
pub fn run_daemon(config: &Config) -> Result<()> {
    let shutdown = Shutdown::new();
    shutdown
        .install()
        .context("Failed to install signal handlers")?;

    let commands = DsfCommandConnection::connect(&config.socket_path).with_context(|| {
        format!(
            "Failed to connect to host socket {}",
            config.socket_path.display()
        )
    })?;
    let mut store = ActionStore::new(commands, config.actions_path.clone());

    let _endpoint = if config.http_endpoint {
        open_endpoint(config, store.resolve_location())
    } else {
        None
    };

    let connector = DsfInterceptConnector::new(
        config.socket_path.clone(),
        config.interception_mode,
        config.protocol_debug,
        shutdown.clone(),
    );
    let mut service = InterceptService::new(connector, store, ShellRunner::new())
        .strict_exit_status(config.strict_exit_status)
        .with_shutdown(shutdown);

    info!(
        "{} started with {} action(s)",
        PLUGIN_NAME,
        service.table().len()
    );
    let result = service.run();
    info!("{} stopped", PLUGIN_NAME);
    result
}

/// The endpoint is optional; failing to register it only costs the side
/// channel.
fn open_endpoint(config: &Config, actions_file: Option<PathBuf>) -> Option<HttpEndpoint> {
    let responder = Box::new(move |_: &ReceivedHttpRequest| match &actions_file {
        Some(path) => match fs::read_to_string(path) {
            Ok(body) => HttpResponse::json(body),
            Err(e) => HttpResponse::status(404, format!("{}: {}", path.display(), e)),
        },
        None => HttpResponse::status(404, "Action file location is unknown"),
    });

    match HttpEndpoint::open(&config.socket_path, PLUGIN_NAME, ENDPOINT_PATH, responder) {
        Ok(endpoint) => Some(endpoint),
        Err(e) => {
            warn!("HTTP endpoint unavailable: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_host_socket_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            socket_path: dir.path().join("dcs.sock"),
            ..Config::default()
        };

        let err = run_daemon(&config).unwrap_err();
        assert!(format!("{}", err).contains("Failed to connect to host socket"));
    }
}
