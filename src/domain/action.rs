//! Configured actions bound to M-codes.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use super::table::is_reserved;

/// Longest accepted `cmd_timeout`, one week.
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Why a single action record was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("{0} is a reserved filter and thus it can't be used")]
    Reserved(String),

    #[error("{0} is not an M-code (expected M<number> or M<number>.<number>)")]
    NotMcode(String),

    #[error("{0}: cmd_timeout must be at least 1 second")]
    ZeroTimeout(String),

    #[error("{0}: cmd_timeout cannot exceed {max} seconds", max = MAX_TIMEOUT_SECS)]
    TimeoutTooLong(String),

    #[error("{0}: cmd_command cannot be empty")]
    EmptyCommand(String),
}

/// One action as stored in the JSON action file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub cmd_code: String,

    #[serde(default)]
    pub cmd_name: String,

    pub cmd_command: String,

    /// Identity to run as; recorded but not enforced yet
    #[serde(default)]
    pub cmd_user: Option<String>,

    /// Timeout in seconds
    pub cmd_timeout: u64,

    pub cmd_capture_output: bool,

    pub cmd_flush: bool,

    pub cmd_enabled: bool,
}

impl ActionRecord {
    /// Example record written when no action file exists yet.
    pub fn example() -> Self {
        Self {
            cmd_code: "M1201".to_string(),
            cmd_name: "Echo test".to_string(),
            cmd_command: format!(
                "echo 'If you can see this, it means {} is working !'",
                crate::PLUGIN_NAME
            ),
            cmd_user: Some(String::new()),
            cmd_timeout: 30,
            cmd_capture_output: false,
            cmd_flush: false,
            cmd_enabled: true,
        }
    }
}

/// A validated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Code that triggers the action, e.g. `M1201`
    pub code: String,

    /// Human readable label
    pub name: String,

    /// Shell command line to execute
    pub command: String,

    /// Identity to run as (not enforced)
    pub user: Option<String>,

    /// Hard wall-clock limit for the command
    pub timeout: Duration,

    /// Relay stdout as the success message
    pub capture_output: bool,

    /// Flush the originating channel before running
    pub flush_before_run: bool,

    pub enabled: bool,
}

fn mcode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^M\d+(\.\d+)?$").expect("valid M-code pattern"))
}

impl TryFrom<ActionRecord> for Action {
    type Error = ActionError;

    fn try_from(record: ActionRecord) -> Result<Self, Self::Error> {
        let code = record.cmd_code.trim().to_string();

        if is_reserved(&code) {
            return Err(ActionError::Reserved(code));
        }
        if !mcode_pattern().is_match(&code) {
            return Err(ActionError::NotMcode(code));
        }
        if record.cmd_timeout == 0 {
            return Err(ActionError::ZeroTimeout(code));
        }
        if record.cmd_timeout > MAX_TIMEOUT_SECS {
            return Err(ActionError::TimeoutTooLong(code));
        }
        if record.cmd_command.trim().is_empty() {
            return Err(ActionError::EmptyCommand(code));
        }

        Ok(Self {
            code,
            name: record.cmd_name,
            command: record.cmd_command,
            user: record.cmd_user.filter(|u| !u.trim().is_empty()),
            timeout: Duration::from_secs(record.cmd_timeout),
            capture_output: record.cmd_capture_output,
            flush_before_run: record.cmd_flush,
            enabled: record.cmd_enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str) -> ActionRecord {
        ActionRecord {
            cmd_code: code.to_string(),
            cmd_command: "true".to_string(),
            ..ActionRecord::example()
        }
    }

    #[test]
    fn test_valid_record() {
        let action = Action::try_from(record("M1201")).unwrap();
        assert_eq!(action.code, "M1201");
        assert_eq!(action.timeout, Duration::from_secs(30));
        assert!(action.enabled);
        // Empty user string means no user
        assert_eq!(action.user, None);
    }

    #[test]
    fn test_minor_number_code() {
        assert!(Action::try_from(record("M1201.1")).is_ok());
    }

    #[test]
    fn test_reserved_code_rejected() {
        assert_eq!(
            Action::try_from(record("M1200")),
            Err(ActionError::Reserved("M1200".to_string()))
        );
    }

    #[test]
    fn test_reserved_minor_variant_rejected() {
        assert_eq!(
            Action::try_from(record("M1200.1")),
            Err(ActionError::Reserved("M1200.1".to_string()))
        );
        // Only the exact major number is reserved
        assert!(Action::try_from(record("M12001")).is_ok());
    }

    #[test]
    fn test_huge_timeout_rejected() {
        let huge = ActionRecord {
            cmd_timeout: u64::MAX,
            ..record("M1201")
        };
        assert_eq!(
            Action::try_from(huge),
            Err(ActionError::TimeoutTooLong("M1201".to_string()))
        );

        let longest = ActionRecord {
            cmd_timeout: MAX_TIMEOUT_SECS,
            ..record("M1201")
        };
        assert!(Action::try_from(longest).is_ok());
    }

    #[test]
    fn test_non_mcode_rejected() {
        assert!(matches!(
            Action::try_from(record("G28")),
            Err(ActionError::NotMcode(_))
        ));
        assert!(matches!(
            Action::try_from(record("M12a")),
            Err(ActionError::NotMcode(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut r = record("M1202");
        r.cmd_timeout = 0;
        assert!(matches!(
            Action::try_from(r),
            Err(ActionError::ZeroTimeout(_))
        ));
    }

    #[test]
    fn test_empty_command_rejected() {
        let mut r = record("M1202");
        r.cmd_command = "  ".to_string();
        assert!(matches!(
            Action::try_from(r),
            Err(ActionError::EmptyCommand(_))
        ));
    }

    #[test]
    fn test_missing_field_fails_to_parse() {
        let json = r#"{"cmd_code":"M1201","cmd_command":"true","cmd_timeout":5}"#;
        let err = serde_json::from_str::<ActionRecord>(json).unwrap_err();
        assert!(err.to_string().contains("cmd_capture_output"));
    }
}
