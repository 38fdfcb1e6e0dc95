//! Execution engine
//!
//! Binds the argument context, resolves the unit and action, checks the
//! action's required parameters and hands the invocation to a transport.
//! The outcome comes back unchanged.

use crate::args::ArgumentContext;
use crate::error::{Error, Result};
use crate::outcome::ExecutionOutcome;
use crate::registry::Registry;
use crate::target::Target;
use crate::transport::{self, Invocation, Transport, TransportOptions};
use crate::unit::Action;

/// Resolves and dispatches actions against a shared registry
///
/// The engine holds no mutable state, so one engine can serve any number
/// of concurrent invocations.
#[derive(Debug)]
pub struct Engine<'r> {
    registry: &'r Registry,
    options: TransportOptions,
}

impl<'r> Engine<'r> {
    pub fn new(registry: &'r Registry, options: TransportOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Run `unit`/`action` on `target` with the given `name=value` tokens
    pub fn apply<S: AsRef<str>>(
        &self,
        unit: &str,
        action: &str,
        tokens: &[S],
        target: &Target,
    ) -> Result<ExecutionOutcome> {
        let mut transport = transport::for_target(target, &self.options);
        self.apply_via(unit, action, tokens, transport.as_mut())
    }

    /// Like [`Engine::apply`] with a caller-supplied transport
    pub fn apply_via<S: AsRef<str>>(
        &self,
        unit: &str,
        action: &str,
        tokens: &[S],
        transport: &mut dyn Transport,
    ) -> Result<ExecutionOutcome> {
        // Malformed tokens are reported before anything is looked up
        let args = ArgumentContext::from_tokens(tokens)?;

        let resolved = self.registry.resolve(unit)?;
        let procedure = resolved.resolve_action(action)?;
        check_required(unit, action, procedure, &args)?;

        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        let invocation = Invocation {
            unit,
            action_name: action,
            action: procedure,
            args: &args,
            tokens: &tokens,
        };

        log::info!("Applying {}|{} on {}", unit, action, transport.target());
        let outcome = transport.execute(&invocation)?;
        log::debug!(
            "{}|{} finished with exit code {}",
            unit,
            action,
            outcome.exit_code
        );

        Ok(outcome)
    }
}

fn check_required(
    unit: &str,
    action: &str,
    procedure: &dyn Action,
    args: &ArgumentContext,
) -> Result<()> {
    match procedure
        .params()
        .iter()
        .find(|p| p.required && !args.contains(p.name))
    {
        Some(missing) => Err(Error::MissingArgument {
            unit: unit.to_string(),
            action: action.to_string(),
            name: missing.name.to_string(),
        }),
        None => Ok(()),
    }
}
