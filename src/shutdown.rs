//! SIGTERM/SIGINT handling.
//!
//! The interception loop spends most of its life blocked on a socket read.
//! On a signal the handler records the request and shuts down the socket of
//! the active session, which makes the pending read return so the loop can
//! close everything and exit normally.

use std::net::Shutdown as SocketShutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

/// Shared shutdown state. Clones observe the same request.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    active: Arc<Mutex<Option<UnixStream>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGTERM and SIGINT to [`Shutdown::trigger`].
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let handle = self.clone();
        ctrlc::set_handler(move || {
            info!("Shutdown signal received");
            handle.trigger();
        })
    }

    /// Record the request and unblock the active session.
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        let active = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(stream) = active {
            if let Err(e) = stream.shutdown(SocketShutdown::Both) {
                debug!("Failed to shut down session socket: {}", e);
            }
        }
    }

    /// Whether a shutdown was requested.
    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Make `stream` (a clone of the session socket) the one to shut down.
    /// Replaces the previously watched session.
    pub fn watch(&self, stream: UnixStream) {
        *self.active.lock().unwrap_or_else(|e| e.into_inner()) = Some(stream);
        // A signal that arrived before the session existed still applies
        if self.requested() {
            self.trigger();
        }
    }
}
