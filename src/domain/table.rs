//! Action table: the authoritative mapping from code to action.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use super::action::{Action, ActionRecord};

/// Reload the action table and re-establish the interception session.
pub const RECONFIGURE_CODE: &str = "M1200";

/// Major number of [`RECONFIGURE_CODE`]; any minor number reconfigures too.
pub const RECONFIGURE_MAJOR: u32 = 1200;

/// Codes handled by the interception loop itself.
pub const RESERVED_CODES: &[&str] = &[RECONFIGURE_CODE];

/// Whether `code` is a reserved code or one of its minor variants
/// (`M1200.3`).
pub fn is_reserved(code: &str) -> bool {
    RESERVED_CODES.iter().any(|reserved| {
        code.strip_prefix(*reserved)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    })
}

/// Receives one diagnostic per dropped action record.
pub trait LoadReporter {
    fn report(&mut self, message: &str);
}

impl LoadReporter for Vec<String> {
    fn report(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Ordered set of actions with constant-time lookup by code.
#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    actions: Vec<Action>,
    index: HashMap<String, usize>,
}

impl ActionTable {
    /// Load actions from a JSON file.
    ///
    /// A missing file is replaced by one example action and yields an empty
    /// table for this run. Unreadable files and malformed records are
    /// reported and skipped; loading itself never fails.
    pub fn load(path: &Path, reporter: &mut dyn LoadReporter) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                match write_example(path) {
                    Ok(()) => info!("Created example action file at {}", path.display()),
                    Err(e) => reporter.report(&format!(
                        "Failed to create example action file {}: {}",
                        path.display(),
                        e
                    )),
                }
                return Self::default();
            }
            Err(e) => {
                reporter.report(&format!(
                    "Failed to read action file {}: {}",
                    path.display(),
                    e
                ));
                return Self::default();
            }
        };

        let records: Vec<Value> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                reporter.report(&format!(
                    "Action file {} must contain a JSON array: {}",
                    path.display(),
                    e
                ));
                return Self::default();
            }
        };

        Self::from_records(records, reporter)
    }

    /// Build a table from raw JSON records, dropping the ones that don't
    /// describe a usable action.
    pub fn from_records(records: Vec<Value>, reporter: &mut dyn LoadReporter) -> Self {
        let mut table = Self::default();

        for (i, value) in records.into_iter().enumerate() {
            let record: ActionRecord = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(e) => {
                    reporter.report(&format!("Action #{}: {}", i, e));
                    continue;
                }
            };

            let action = match Action::try_from(record) {
                Ok(action) => action,
                Err(e) => {
                    reporter.report(&e.to_string());
                    continue;
                }
            };

            if table.index.contains_key(&action.code) {
                reporter.report(&format!(
                    "{} is defined more than once, keeping the first definition",
                    action.code
                ));
                continue;
            }

            debug!("Loaded action {} ({})", action.code, action.name);
            table.index.insert(action.code.clone(), table.actions.len());
            table.actions.push(action);
        }

        table
    }

    pub fn lookup(&self, code: &str) -> Option<&Action> {
        self.index.get(code).map(|&i| &self.actions[i])
    }

    /// Codes the interception session must route to us.
    pub fn filter_codes(&self) -> BTreeSet<String> {
        self.actions
            .iter()
            .map(|a| a.code.clone())
            .chain(RESERVED_CODES.iter().map(|c| c.to_string()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

fn write_example(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&[ActionRecord::example()])?;
    fs::write(path, content)
}
