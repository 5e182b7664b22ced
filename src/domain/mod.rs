//! Domain layer containing core business logic.
//!
//! This module contains:
//! - Intercepted code representation
//! - Actions and the action table
//! - External command runner with timeouts
//! - Logger with rotation

pub mod action;
pub mod code;
mod error;
pub mod logger;
pub mod runner;
pub mod table;

pub use action::Action;
pub use code::Code;
pub use error::McodeError;
pub use runner::{ActionRunner, ExecOutcome, ShellRunner};
pub use table::{ActionTable, LoadReporter, RECONFIGURE_MAJOR};
