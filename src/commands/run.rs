//! `apply`, `check` and `rollback`

use crate::Context;
use crate::cli::ActionArgs;
use crate::prompt;
use anyhow::Result;
use unitkit::{Engine, Target, report};

/// Run one action and print its result line. Returns the exit status.
pub fn run(ctx: &Context, action: &str, args: &ActionArgs) -> Result<u8> {
    let target = Target::parse(args.target.as_deref())?;

    let mut options = ctx.config.transport_options(args.timeout);
    if !target.is_local() {
        options.prompt = prompt::terminal_prompt();
    }

    let registry = ctx.registry()?;
    let engine = Engine::new(&registry, options);
    let outcome = engine.apply(&args.unit, action, &args.args, &target)?;

    if !outcome.stderr.trim().is_empty() {
        log::debug!("{}|{} stderr:\n{}", args.unit, action, outcome.stderr.trim_end());
    }

    let report = report::report(&args.unit, action, &outcome);
    println!("{}", report.line);
    Ok(report.exit_code)
}
