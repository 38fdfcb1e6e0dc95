//! Local transport: runs the action in-process on this host

use super::{Invocation, Transport, TransportState};
use crate::error::{Error, Result};
use crate::outcome::ExecutionOutcome;
use crate::target::Target;
use crate::unit::ActionContext;
use std::time::Duration;

pub struct LocalTransport {
    target: Target,
    state: TransportState,
    timeout: Option<Duration>,
}

impl LocalTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            target: Target::Local,
            state: TransportState::Idle,
            timeout,
        }
    }

    fn set_state(&mut self, state: TransportState) {
        log::debug!("local transport: {} -> {}", self.state, state);
        self.state = state;
    }
}

impl Transport for LocalTransport {
    fn target(&self) -> &Target {
        &self.target
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn execute(&mut self, invocation: &Invocation<'_>) -> Result<ExecutionOutcome> {
        self.set_state(TransportState::Executing);

        let ctx = ActionContext::new(invocation.args).with_timeout(self.timeout);
        let result = invocation
            .action
            .run(&ctx)
            .map_err(|e| into_engine_error(e, invocation));

        match &result {
            Ok(_) => self.set_state(TransportState::Completed),
            Err(_) => self.set_state(TransportState::Failed),
        }

        result
    }
}

/// Actions report "could not run" through anyhow. Keep an engine error
/// that is already typed (e.g. a timeout), wrap anything else.
fn into_engine_error(err: anyhow::Error, invocation: &Invocation<'_>) -> Error {
    match err.downcast::<Error>() {
        Ok(engine) => engine,
        Err(other) => Error::transport(
            "local",
            format!(
                "{}|{} could not run: {:#}",
                invocation.unit, invocation.action_name, other
            ),
        ),
    }
}
