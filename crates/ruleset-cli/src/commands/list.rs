//! List command: show rulesets without touching the network

use colored::Colorize;
use serde_json::json;

use crate::context::Context;
use crate::error::{CliError, Result};

/// Run the list command
pub fn run_list(ctx: &Context, json: bool) -> Result<()> {
    let store = ctx.store();
    let mut rulesets = Vec::new();
    let mut unreadable = 0;

    for loaded in store.load_all()? {
        match loaded {
            Ok(ruleset) => rulesets.push(ruleset),
            Err(e) => {
                unreadable += 1;
                eprintln!("{} {}", "warning:".yellow().bold(), e);
            }
        }
    }

    if json {
        let entries: Vec<serde_json::Value> = rulesets
            .iter()
            .map(|ruleset| {
                json!({
                    "name": ruleset.name(),
                    "path": ruleset.path().as_str(),
                    "references": ruleset
                        .references()
                        .map(|(_, r)| r.name())
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if rulesets.is_empty() && unreadable == 0 {
        println!("No ruleset files found in {}", store.root());
    } else {
        for ruleset in &rulesets {
            println!(
                "{} ({} references)",
                ruleset.name().cyan().bold(),
                ruleset.reference_count()
            );
            for (_, reference) in ruleset.references() {
                println!("  {}", reference.name());
            }
        }
    }

    if unreadable > 0 {
        return Err(CliError::user(format!(
            "{} ruleset(s) could not be read",
            unreadable
        )));
    }
    Ok(())
}
