//! `args`: greets whoever is named in the context

use unitkit::{ActionContext, ExecutionOutcome, FnAction, Param, Unit};

const PARAMS: &[Param] = &[Param::required("name", "Who to greet")];

fn apply(ctx: &ActionContext) -> anyhow::Result<ExecutionOutcome> {
    let name = ctx.args.require("name")?;
    Ok(ExecutionOutcome::success(format!("hi {}", name)))
}

pub fn unit() -> unitkit::Result<Unit> {
    Unit::builder("args")
        .description("Greet by name")
        .action("apply", FnAction::new("Greet `name`", PARAMS, apply))
        .build()
}
