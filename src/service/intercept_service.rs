//! The interception loop.

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::action_store::ActionLoader;
use crate::domain::{
    Action, ActionRunner, ActionTable, Code, ExecOutcome, McodeError, RECONFIGURE_MAJOR,
};
use crate::shutdown::Shutdown;
use crate::transport::{InterceptSession, MessageType, SessionConnector};
use crate::PLUGIN_NAME;

/// Terminal outcome for one received code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handed back to the host unmodified
    PassedThrough,
    /// Cancelled because the channel could not be flushed
    Rejected,
    /// Resolved after running an action
    Resolved { success: bool },
    /// Resolved after reloading the action table; the session must be
    /// re-established
    Reconfigured,
}

enum Resolution {
    Success(Option<String>),
    Failure(String),
}

/// Receives codes one at a time and runs the matching actions.
pub struct InterceptService<C, L, R> {
    connector: C,
    loader: L,
    runner: R,
    table: ActionTable,
    strict_exit_status: bool,
    shutdown: Shutdown,
}

impl<C, L, R> InterceptService<C, L, R>
where
    C: SessionConnector,
    L: ActionLoader,
    R: ActionRunner,
{
    /// Create the service and load the initial action table.
    pub fn new(connector: C, mut loader: L, runner: R) -> Self {
        let table = loader.load_actions();
        Self {
            connector,
            loader,
            runner,
            table,
            strict_exit_status: false,
            shutdown: Shutdown::new(),
        }
    }

    /// Stop the loop once `shutdown` is triggered.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Resolve actions whose command exits with a non-zero status as
    /// failures.
    pub fn strict_exit_status(mut self, strict: bool) -> Self {
        self.strict_exit_status = strict;
        self
    }

    pub fn table(&self) -> &ActionTable {
        &self.table
    }

    /// Run until the session fails or a shutdown is requested.
    ///
    /// Session errors are fatal: the session is closed and the error
    /// returned. A shutdown request ends the loop with `Ok`.
    pub fn run(&mut self) -> Result<()> {
        let mut session = self.connect()?;

        loop {
            if self.shutdown.requested() {
                info!("Shutdown requested, closing interception session");
                let _ = session.close();
                return Ok(());
            }

            let code = match session.receive_code() {
                Ok(code) => code,
                Err(_) if self.shutdown.requested() => continue,
                Err(e) => return Err(fail(&mut session, e)),
            };
            debug!("Received {}", code);

            match self.process(&mut session, &code) {
                Ok(Disposition::Reconfigured) => {
                    if let Err(e) = session.close() {
                        warn!("Failed to close interception session: {}", e);
                    }
                    session = self.connect()?;
                }
                Ok(disposition) => debug!("{} -> {:?}", code, disposition),
                Err(e) if self.shutdown.requested() => {
                    debug!("{} interrupted by shutdown: {}", code, e);
                }
                Err(e) => return Err(fail(&mut session, e)),
            }
        }
    }

    fn connect(&mut self) -> Result<C::Session> {
        self.connector
            .connect(&self.table.filter_codes())
            .context("Failed to establish interception session")
    }

    /// Give `code` exactly one terminal disposition.
    pub fn process<S: InterceptSession>(
        &mut self,
        session: &mut S,
        code: &Code,
    ) -> Result<Disposition, McodeError> {
        if !code.is_mcode() {
            session.ignore_code()?;
            return Ok(Disposition::PassedThrough);
        }

        if code.major_number == Some(RECONFIGURE_MAJOR) {
            return self.reconfigure(session);
        }

        let key = code.short_str();
        let action = match self.table.lookup(&key) {
            Some(action) if action.enabled => action,
            _ => {
                session.ignore_code()?;
                return Ok(Disposition::PassedThrough);
            }
        };

        // Make sure the machine has caught up with everything queued before
        // this code
        if action.flush_before_run && !session.flush(&code.channel)? {
            warn!(
                "Flush of channel {} failed, cancelling {}",
                code.channel, key
            );
            session.cancel_code()?;
            return Ok(Disposition::Rejected);
        }

        info!("Running action {} ({})", action.code, action.name);
        let outcome = self.runner.run(action);

        match resolve(action, outcome, self.strict_exit_status) {
            Resolution::Failure(message) => {
                warn!("{}", message);
                let content = format!("{}: {}", PLUGIN_NAME, message);
                session.resolve_code(MessageType::Error, Some(&content))?;
                Ok(Disposition::Resolved { success: false })
            }
            Resolution::Success(output) => {
                session.resolve_code(MessageType::Success, output.as_deref())?;
                Ok(Disposition::Resolved { success: true })
            }
        }
    }

    fn reconfigure<S: InterceptSession>(
        &mut self,
        session: &mut S,
    ) -> Result<Disposition, McodeError> {
        self.table = self.loader.load_actions();
        info!(
            "Action table reloaded, {} action(s) configured",
            self.table.len()
        );

        let message = format!("{}: Interception filters successfully updated", PLUGIN_NAME);
        session.resolve_code(MessageType::Success, Some(&message))?;
        Ok(Disposition::Reconfigured)
    }
}

fn fail<S: InterceptSession>(session: &mut S, e: McodeError) -> anyhow::Error {
    error!("Closing interception session: {}", e);
    let _ = session.close();
    anyhow::Error::new(e).context("Interception session failed")
}

fn resolve(action: &Action, outcome: ExecOutcome, strict_exit_status: bool) -> Resolution {
    match outcome {
        ExecOutcome::TimedOut { partial_output } => {
            let mut message = format!(
                "Timeout expired on `{}` after {}s.",
                action.command,
                action.timeout.as_secs()
            );
            if let Some(output) = partial_output.filter(|o| !o.trim().is_empty()) {
                message.push_str("\nOutput was: ");
                message.push_str(trim_line_end(&output));
            }
            Resolution::Failure(message)
        }
        ExecOutcome::Failed { reason } => {
            Resolution::Failure(format!("Failed to run `{}`: {}", action.command, reason))
        }
        ExecOutcome::Finished { status, stdout } => {
            if !status.success() {
                if strict_exit_status {
                    let mut message = format!("`{}` exited with {}", action.command, status);
                    if let Some(output) = stdout.as_deref().filter(|o| !o.trim().is_empty()) {
                        message.push_str("\nOutput was: ");
                        message.push_str(trim_line_end(output));
                    }
                    return Resolution::Failure(message);
                }
                warn!(
                    "{}: `{}` exited with {}",
                    action.code, action.command, status
                );
            }

            let output = stdout
                .filter(|_| action.capture_output)
                .map(|o| trim_line_end(&o).to_string())
                .filter(|o| !o.is_empty());
            Resolution::Success(output)
        }
    }
}

fn trim_line_end(output: &str) -> &str {
    output.trim_end_matches(|c| c == '\n' || c == '\r')
}
