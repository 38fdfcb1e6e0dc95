//! Transports execute a resolved action against a target.
//!
//! Each transport walks the same state machine:
//! `Idle → Connecting (remote only) → Executing → Completed | Failed`.
//! No transport retries on its own.

pub mod local;
pub mod ssh;

use crate::args::ArgumentContext;
use crate::error::Result;
use crate::outcome::ExecutionOutcome;
use crate::target::Target;
use crate::unit::Action;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use local::LocalTransport;
pub use ssh::{PasswordPrompt, SshOptions, SshTransport};

/// Lifecycle of a single transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Connecting,
    Executing,
    Completed,
    Failed,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything a transport needs to run one action
pub struct Invocation<'a> {
    pub unit: &'a str,
    pub action_name: &'a str,
    pub action: &'a dyn Action,
    pub args: &'a ArgumentContext,
    /// The raw tokens the context was built from, forwarded verbatim to remote hosts
    pub tokens: &'a [String],
}

/// Executes an invocation and captures its outcome
pub trait Transport {
    /// The target this transport talks to
    fn target(&self) -> &Target;

    /// Current lifecycle state
    fn state(&self) -> TransportState;

    /// Run the invocation to completion
    fn execute(&mut self, invocation: &Invocation<'_>) -> Result<ExecutionOutcome>;
}

/// Options shared by every transport
#[derive(Clone, Default)]
pub struct TransportOptions {
    /// Upper bound on the whole execution
    pub timeout: Option<Duration>,
    pub ssh: SshOptions,
    pub prompt: Option<Arc<dyn PasswordPrompt>>,
}

impl fmt::Debug for TransportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportOptions")
            .field("timeout", &self.timeout)
            .field("ssh", &self.ssh)
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

/// Pick the transport for a target
pub fn for_target(target: &Target, options: &TransportOptions) -> Box<dyn Transport> {
    match target {
        Target::Local => Box::new(LocalTransport::new(options.timeout)),
        Target::Ssh(ssh) => Box::new(SshTransport::new(
            ssh.clone(),
            options.ssh.clone(),
            options.timeout,
            options.prompt.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_target_selects_transport() {
        let options = TransportOptions::default();

        let local = for_target(&Target::Local, &options);
        assert!(local.target().is_local());
        assert_eq!(local.state(), TransportState::Idle);

        let remote: Target = "ssh://root@box".parse().unwrap();
        let ssh = for_target(&remote, &options);
        assert_eq!(ssh.target(), &remote);
        assert_eq!(ssh.state(), TransportState::Idle);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TransportState::Connecting.to_string(), "connecting");
        assert_eq!(TransportState::Failed.to_string(), "failed");
    }
}
