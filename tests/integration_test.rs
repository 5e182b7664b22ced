//! Integration tests for the exec-on-mcode CLI.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run exec-on-mcode with the given arguments and return (stdout, stderr, exit_code).
fn run(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_exec-on-mcode"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run exec-on-mcode");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn action(code: &str, command: &str) -> String {
    format!(
        r#"{{"cmd_code":"{}","cmd_name":"test","cmd_command":"{}","cmd_timeout":5,
            "cmd_capture_output":true,"cmd_flush":false,"cmd_enabled":true}}"#,
        code, command
    )
}

#[test]
fn test_version() {
    let (stdout, _stderr, exit_code) = run(&["version"]);

    assert_eq!(exit_code, 0);
    assert!(stdout.starts_with("exec-on-mcode "), "{}", stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_init_creates_loadable_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.toml");

    let (_stdout, stderr, exit_code) = run(&["init", "--path", path_str(&config)]);
    assert_eq!(exit_code, 0, "{}", stderr);
    assert!(stderr.contains("Configuration file created at"));

    let content = fs::read_to_string(&config).unwrap();
    assert!(content.contains("socket_path"));
    assert!(content.contains("actions_path"));

    let (_stdout, stderr, exit_code) = run(&["check", "--config", path_str(&config)]);
    assert_eq!(exit_code, 0, "{}", stderr);
    assert!(stderr.contains("Configuration is valid."));
}

#[test]
fn test_check_creates_missing_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    let (_stdout, stderr, exit_code) = run(&["check", "-c", path_str(&config)]);
    assert_eq!(exit_code, 0, "{}", stderr);
    assert!(config.exists());
}

#[test]
fn test_check_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "socket_path = \"\"\n").unwrap();

    let (_stdout, stderr, exit_code) = run(&["check", "--config", path_str(&config)]);
    assert_ne!(exit_code, 0);
    assert!(stderr.contains("Invalid configuration"), "{}", stderr);
}

#[test]
fn test_check_rejects_unknown_interception_mode() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "interception_mode = \"sometimes\"\n").unwrap();

    let (_stdout, stderr, exit_code) = run(&["check", "--config", path_str(&config)]);
    assert_ne!(exit_code, 0);
    assert!(stderr.contains("Failed to parse config file"), "{}", stderr);
}

#[test]
fn test_check_valid_action_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let actions = dir.path().join("actions.json");
    fs::write(
        &actions,
        format!("[{}, {}]", action("M1201", "echo hi"), action("M1202.1", "true")),
    )
    .unwrap();

    let (_stdout, stderr, exit_code) = run(&[
        "check",
        "--config",
        path_str(&config),
        "--actions",
        path_str(&actions),
    ]);
    assert_eq!(exit_code, 0, "{}", stderr);
    assert!(stderr.contains("M1201 test -> `echo hi`"), "{}", stderr);
    assert!(stderr.contains("Filters: M1200, M1201, M1202.1"), "{}", stderr);
    assert!(stderr.contains("Action file is valid (2 action(s))."));
}

#[test]
fn test_check_reports_dropped_actions() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let actions = dir.path().join("actions.json");
    fs::write(
        &actions,
        format!(
            "[{}, {}, {}]",
            action("M1201", "echo hi"),
            action("M1200", "true"),
            action("G28", "true")
        ),
    )
    .unwrap();

    let (_stdout, stderr, exit_code) = run(&[
        "check",
        "--config",
        path_str(&config),
        "--actions",
        path_str(&actions),
    ]);
    assert_ne!(exit_code, 0);
    assert!(stderr.contains("M1200 is a reserved filter"), "{}", stderr);
    assert!(stderr.contains("2 problem(s) found"), "{}", stderr);
}

#[test]
fn test_check_missing_action_file_is_not_created() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let actions = dir.path().join("missing.json");

    let (_stdout, stderr, exit_code) = run(&[
        "check",
        "--config",
        path_str(&config),
        "--actions",
        path_str(&actions),
    ]);
    assert_ne!(exit_code, 0);
    assert!(stderr.contains("Action file not found"), "{}", stderr);
    assert!(!actions.exists());
}

#[test]
fn test_run_fails_without_host() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let socket = dir.path().join("dcs.sock");

    let (_stdout, stderr, exit_code) = run(&[
        "run",
        "--config",
        path_str(&config),
        "--socket",
        path_str(&socket),
    ]);
    assert_ne!(exit_code, 0);
    assert!(stderr.contains("Failed to connect to host socket"), "{}", stderr);
}
