//! `units`: list what can be applied

use crate::Context;
use crate::ui;
use anyhow::Result;
use unitkit::UnitSummary;

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let registry = ctx.registry()?;
    let summaries = registry.summaries();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    ui::header("Units");
    if summaries.is_empty() {
        ui::dim("No units registered");
        return Ok(());
    }

    for unit in &summaries {
        print_unit(unit, ctx.verbose > 0);
    }
    Ok(())
}

fn print_unit(unit: &UnitSummary, verbose: bool) {
    ui::section(&unit.name);
    if !unit.description.is_empty() {
        ui::dim(&unit.description);
    }

    for action in &unit.actions {
        let params: Vec<String> = action
            .params
            .iter()
            .map(|p| {
                if p.required {
                    format!("{}=<value>", p.name)
                } else {
                    format!("[{}=<value>]", p.name)
                }
            })
            .collect();

        let usage = if params.is_empty() {
            action.name.clone()
        } else {
            format!("{} {}", action.name, params.join(" "))
        };
        ui::kv(&usage, &action.description);

        if verbose {
            for param in &action.params {
                ui::dim(&format!("  {}: {}", param.name, param.description));
            }
        }
    }
}
