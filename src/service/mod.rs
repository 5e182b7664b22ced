//! Service layer containing business logic orchestration.

mod action_store;
mod daemon;
mod intercept_service;

pub use daemon::run_daemon;
