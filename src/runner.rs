use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use std::time::Duration;
use unitkit::process::{self, ProcessOutput};

/// Run a command and capture its output, bounded by `timeout`
pub fn run_capture(cmd: &str, args: &[&str], timeout: Option<Duration>) -> Result<ProcessOutput> {
    let mut command = Command::new(cmd);
    command.args(args);

    process::run(command, timeout)
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("sysunit-definitely-not-a-command"));
    }

    #[test]
    fn test_run_capture() {
        let output = run_capture("sh", &["-c", "echo out; echo err >&2; exit 2"], None).unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert!(!output.success());
    }

    #[test]
    fn test_run_capture_missing_program() {
        let err = run_capture("sysunit-definitely-not-a-command", &[], None).unwrap_err();
        assert!(err.to_string().contains("Failed to execute"));
    }
}
