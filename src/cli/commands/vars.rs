//! Template variable management.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use std::sync::Arc;

use crate::api::VariableSet;
use crate::storage::BlobStore;

#[derive(Subcommand)]
pub enum VarsCommands {
    /// Set a variable, usable as {{NAME}} in URLs and bodies
    Set { name: String, value: String },
    /// List all variables
    List,
    /// Remove a variable
    Remove { name: String },
}

pub fn handle(cmd: VarsCommands, store: Arc<dyn BlobStore>) -> Result<()> {
    let mut variables = VariableSet::load(store);

    match cmd {
        VarsCommands::Set { name, value } => {
            variables.set(&name, &value)?;
            println!(
                "{} Variable {} set",
                "✓".bright_green().bold(),
                format!("{{{{{}}}}}", name).bright_yellow()
            );
        }
        VarsCommands::List => {
            if variables.is_empty() {
                println!("{}", "No variables defined".dimmed());
                return Ok(());
            }
            for (name, value) in variables.map() {
                println!("  {:<24} {}", format!("{{{{{}}}}}", name).bright_yellow(), value);
            }
        }
        VarsCommands::Remove { name } => {
            if variables.remove(&name) {
                println!("{} Variable '{}' removed", "✓".bright_green().bold(), name);
            } else {
                println!("{}", format!("⚠ No variable named '{}'", name).bright_yellow());
            }
        }
    }
    Ok(())
}
