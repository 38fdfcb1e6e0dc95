//! Captured result of running an action

use serde::{Deserialize, Serialize};

/// What an action produced: exactly one exit status plus its output text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutcome {
    /// Successful outcome whose stdout is `message`
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: message.into(),
            stderr: String::new(),
        }
    }

    /// Failing outcome with the given status and message
    pub fn failure(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: message.into(),
            stderr: String::new(),
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// The message reported on the result line.
    ///
    /// First non-empty stdout line; a silent failing action falls back to
    /// its first non-empty stderr line.
    pub fn message(&self) -> &str {
        match first_line(&self.stdout) {
            Some(line) => line,
            None if !self.is_success() => first_line(&self.stderr).unwrap_or(""),
            None => "",
        }
    }
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}
