//! Target environment selection.

use anyhow::Result;
use colored::*;
use std::sync::Arc;

use crate::services::Environment;
use crate::storage::{keys, BlobStore};

/// Read the persisted environment selection, defaulting to prod.
pub fn current(store: &Arc<dyn BlobStore>) -> Environment {
    store
        .get_blob(keys::ENVIRONMENT)
        .and_then(|raw| Environment::parse(raw.trim()))
        .unwrap_or_default()
}

pub fn handle(selection: Option<&str>, store: &Arc<dyn BlobStore>) -> Result<()> {
    match selection {
        Some(raw) => {
            let environment = Environment::parse(raw).ok_or_else(|| {
                anyhow::anyhow!("Unknown environment '{}'; expected prod, dev or qa", raw)
            })?;
            store.set_blob(keys::ENVIRONMENT, environment.as_str());
            println!(
                "{} Environment set to {}",
                "✓".bright_green().bold(),
                environment.as_str().bright_yellow().bold()
            );
        }
        None => {
            println!(
                "Current environment: {}",
                current(store).as_str().bright_yellow().bold()
            );
        }
    }
    Ok(())
}
