//! Interactive SSH password prompt

use anyhow::{Context, Result};
use dialoguer::Password;
use std::io::IsTerminal;
use std::sync::Arc;
use unitkit::PasswordPrompt;

/// Asks on the terminal once key-based auth has failed
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn password(&self, user: &str, host: &str) -> Result<String> {
        Password::new()
            .with_prompt(format!("Password for {}@{}", user, host))
            .interact()
            .context("Failed to read password")
    }
}

/// A prompt only when stdin is a terminal, so pipes and CI never hang
pub fn terminal_prompt() -> Option<Arc<dyn PasswordPrompt>> {
    if std::io::stdin().is_terminal() {
        Some(Arc::new(TerminalPrompt))
    } else {
        None
    }
}
