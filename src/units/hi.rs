//! `hi`: the smallest possible unit

use unitkit::{ActionContext, ExecutionOutcome, FnAction, Unit};

fn apply(_ctx: &ActionContext) -> anyhow::Result<ExecutionOutcome> {
    Ok(ExecutionOutcome::success("hiiii!"))
}

pub fn unit() -> unitkit::Result<Unit> {
    Unit::builder("hi")
        .description("Say hi")
        .action("apply", FnAction::new("Print a greeting", &[], apply))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use unitkit::{Action, ArgumentContext};

    #[test]
    fn test_apply_ignores_context() {
        let unit = unit().unwrap();
        let args = ArgumentContext::from_tokens(&["anything=goes"]).unwrap();
        let outcome = unit
            .resolve_action("apply")
            .unwrap()
            .run(&ActionContext::new(&args))
            .unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.message(), "hiiii!");
    }
}
