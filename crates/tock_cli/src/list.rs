//! `tock list`: print the built-in circuit catalog.

use crate::circuits::CIRCUITS;
use crate::{GlobalArgs, ListArgs};

/// Runs the `tock list` command.
pub fn run(args: &ListArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&catalog_json())?);
        return Ok(0);
    }
    for c in CIRCUITS {
        println!("{:<16} {}", c.name, c.about);
        println!("{:<16} param: {} (default {})", "", c.param_doc, c.default_param);
    }
    Ok(0)
}

fn catalog_json() -> serde_json::Value {
    CIRCUITS
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "about": c.about,
                "param": c.param_doc,
                "default_param": c.default_param,
                "clock": c.clock,
            })
        })
        .collect()
}
