//! Configuration validation.

use anyhow::{bail, Result};

use super::Config;

/// Validate configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.socket_path.as_os_str().is_empty() {
        bail!("socket_path cannot be empty");
    }
    if config.socket_path.to_string_lossy().contains('\0') {
        bail!("Invalid socket_path: contains null character");
    }

    if config.actions_path.trim().is_empty() {
        bail!("actions_path cannot be empty");
    }
    if config.actions_path.contains('\0') {
        bail!("Invalid actions_path: contains null character");
    }

    // Validate log path
    if !config.log_path.as_os_str().is_empty() {
        // Path will be created if it doesn't exist, so just check it's valid
        if config.log_path.to_string_lossy().contains('\0') {
            bail!("Invalid log_path: contains null character");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_socket_path() {
        let config = Config {
            socket_path: PathBuf::new(),
            ..Config::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("socket_path"));
    }

    #[test]
    fn test_blank_actions_path() {
        let config = Config {
            actions_path: "   ".to_string(),
            ..Config::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("actions_path"));
    }
}
