//! Configuration command handlers

use crate::cli::output::{print_json, success};
use crate::cli::{AppContext, ConfigCommands};
use crate::error::Result;
use serde_json::Value;

pub fn handle(ctx: &mut AppContext, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => print_json(ctx.config())?,
        ConfigCommands::Get { key } => {
            let value = ctx.store.get(&key)?;
            match value {
                Value::String(s) if !ctx.json => println!("{s}"),
                other => print_json(&other)?,
            }
        }
        ConfigCommands::Set { key, value } => {
            ctx.store.set(&key, &value)?;
            success(&format!("{key} updated"));
        }
        ConfigCommands::Reset => {
            ctx.store.reset_to_defaults()?;
            success("Configuration reset to defaults");
        }
        ConfigCommands::Export { path } => {
            ctx.store.export(&path)?;
            success(&format!("Configuration exported to {}", path.display()));
        }
        ConfigCommands::Import { path } => {
            ctx.store.import(&path)?;
            success(&format!("Configuration imported from {}", path.display()));
        }
    }
    Ok(())
}
