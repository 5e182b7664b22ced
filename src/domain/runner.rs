//! External command execution with a hard deadline.
//!
//! Commands run through `/bin/sh -c` in their own process group, so a
//! timeout takes down everything the shell started, not only the shell.

use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use super::action::{Action, MAX_TIMEOUT_SECS};

/// How long to wait for the output pipe to drain after the process group
/// was killed.
const REAP_GRACE: Duration = Duration::from_secs(2);

/// Result of running one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The command exited on its own before the deadline
    Finished {
        status: ExitStatus,
        /// Captured stdout, `None` when output capture is off
        stdout: Option<String>,
    },
    /// The deadline passed and the process group was killed
    TimedOut { partial_output: Option<String> },
    /// The command could not be run at all
    Failed { reason: String },
}

/// Runs the external command bound to an action.
pub trait ActionRunner {
    fn run(&self, action: &Action) -> ExecOutcome;
}

/// Runs actions through a POSIX shell.
pub struct ShellRunner {
    shell: PathBuf,
    poll_interval: Duration,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn(&self, action: &Action) -> std::io::Result<Child> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&action.command)
            .stdin(Stdio::null())
            .process_group(0);

        if action.capture_output {
            cmd.stdout(Stdio::piped());
        }

        cmd.spawn()
    }
}

impl ActionRunner for ShellRunner {
    fn run(&self, action: &Action) -> ExecOutcome {
        if let Some(user) = &action.user {
            debug!(
                "{}: cmd_user '{}' is not enforced, running as the current user",
                action.code, user
            );
        }
        debug!("Executing {}: {}", action.code, action.command);

        let mut child = match self.spawn(action) {
            Ok(child) => child,
            Err(e) => {
                return ExecOutcome::Failed {
                    reason: format!("failed to start {}: {}", self.shell.display(), e),
                }
            }
        };

        let output = child.stdout.take().map(OutputCollector::start);
        let deadline = deadline_after(action.timeout);

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    // Background jobs may still hold the pipe open
                    if let Some(output) = &output {
                        if !output.wait_until(deadline) {
                            kill_group(&mut child);
                            output.wait_until(Instant::now() + REAP_GRACE);
                            return ExecOutcome::TimedOut {
                                partial_output: Some(output.take()),
                            };
                        }
                    }
                    return ExecOutcome::Finished {
                        status,
                        stdout: output.map(|o| o.take()),
                    };
                }
                Ok(None) if Instant::now() >= deadline => {
                    kill_group(&mut child);
                    let partial_output = output.map(|o| {
                        o.wait_until(Instant::now() + REAP_GRACE);
                        o.take()
                    });
                    return ExecOutcome::TimedOut { partial_output };
                }
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => {
                    kill_group(&mut child);
                    return ExecOutcome::Failed {
                        reason: format!("failed to wait for command: {}", e),
                    };
                }
            }
        }
    }
}

/// Deadline for a command started now. Timeouts too large for the clock
/// are capped at the longest accepted action timeout.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(Duration::from_secs(MAX_TIMEOUT_SECS)))
        .unwrap_or(now)
}

/// SIGKILL the child's process group and reap the child.
fn kill_group(child: &mut Child) {
    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        debug!("killpg({}) failed: {}, killing the child only", pgid, e);
        let _ = child.kill();
    }
    if let Err(e) = child.wait() {
        warn!("Failed to reap command {}: {}", child.id(), e);
    }
}

/// Drains a stdout pipe on a helper thread.
///
/// Output is appended to a shared buffer as it arrives so a partial result
/// is available even if the pipe never reaches EOF.
struct OutputCollector {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<()>,
}

impl OutputCollector {
    fn start(mut stdout: ChildStdout) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let shared = Arc::clone(&buffer);

        thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match stdout.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => shared
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });

        Self { buffer, done }
    }

    /// Wait for EOF on the pipe; false if `until` passed first.
    fn wait_until(&self, until: Instant) -> bool {
        let remaining = until.saturating_duration_since(Instant::now());
        match self.done.recv_timeout(remaining) {
            Ok(()) => true,
            // The reader thread is gone, so the pipe is finished too
            Err(mpsc::RecvTimeoutError::Disconnected) => true,
            Err(mpsc::RecvTimeoutError::Timeout) => false,
        }
    }

    fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.buffer.lock().unwrap_or_else(|e| e.into_inner()));
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
